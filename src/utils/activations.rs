//! Activation functions for neural networks
//!
//! This module provides the element-wise non-linearities a layer applies to
//! its weighted sums:
//! - Sigmoid: `1 / (1 + exp(-x))`
//! - Rectifier (ReLU): `max(x, 0)`

use crate::matrix::Matrix;
use serde::Deserialize;

/// Sigmoid activation function.
///
/// Returns the sigmoid of the input: 1 / (1 + exp(-x))
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Sigmoid derivative expressed through the weighted sum `x`.
///
/// Returns `sigmoid(x) * (1 - sigmoid(x))`.
pub fn sigmoid_derivative(x: f64) -> f64 {
    let s = sigmoid(x);
    s * (1.0 - s)
}

/// Rectifier activation function.
pub fn relu(x: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        0.0
    }
}

/// Rectifier derivative. At exactly `x == 0` the sub-gradient 0 is used.
pub fn relu_derivative(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Element-wise activation applied by a layer.
///
/// Deserializes from `"sigmoid"` or `"rectifier"` (alias `"relu"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Sigmoid,
    #[serde(alias = "relu")]
    Rectifier,
}

impl Activation {
    /// Applies the activation to every element of `x`.
    pub fn apply(&self, x: &Matrix) -> Matrix {
        match self {
            Activation::Sigmoid => x.map(sigmoid),
            Activation::Rectifier => x.map(relu),
        }
    }

    /// Applies the activation's first derivative to every element of `x`.
    ///
    /// `x` is the weighted sum the activation was applied to, not its output.
    pub fn apply_derivative(&self, x: &Matrix) -> Matrix {
        match self {
            Activation::Sigmoid => x.map(sigmoid_derivative),
            Activation::Rectifier => x.map(relu_derivative),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Activation::Sigmoid => "sigmoid",
            Activation::Rectifier => "rectifier",
        }
    }

    /// Parses a case-insensitive activation name.
    pub fn from_name(name: &str) -> Option<Activation> {
        match name.to_lowercase().as_str() {
            "sigmoid" => Some(Activation::Sigmoid),
            "rectifier" | "relu" => Some(Activation::Rectifier),
            _ => None,
        }
    }
}
