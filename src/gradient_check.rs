//! Numeric verification of backpropagated gradients
//!
//! Every parameter is nudged by `±EPSILON` and the central difference of the
//! squared-error cost is compared with the gradient backpropagation produced
//! for the same sample.

use crate::matrix::Matrix;
use crate::network::NeuralNetwork;
use crate::training::{Network, Sample};
use crate::utils::rng::SimpleRng;
use log::debug;

/// Perturbation used for the central difference.
pub const EPSILON: f64 = 1e-5;

/// Relative error below which an analytic gradient is accepted.
pub const DEFAULT_GRADIENT_TOLERANCE: f64 = 1e-4;

/// Absolute difference below which two gradients are equal regardless of
/// their relative error.
const ABSOLUTE_TOLERANCE: f64 = 1e-9;

/// Comparison for one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientCheckEntry {
    pub layer: usize,
    pub parameter: usize,
    pub numeric: f64,
    pub analytic: f64,
    pub relative_error: f64,
}

impl GradientCheckEntry {
    fn new(layer: usize, parameter: usize, numeric: f64, analytic: f64) -> Self {
        let scale = numeric.abs().max(analytic.abs());
        let relative_error = if scale < f64::MIN_POSITIVE {
            0.0
        } else {
            (numeric - analytic).abs() / scale
        };
        Self {
            layer,
            parameter,
            numeric,
            analytic,
            relative_error,
        }
    }

    pub fn passes(&self, tolerance: f64) -> bool {
        self.relative_error < tolerance || (self.numeric - self.analytic).abs() < ABSOLUTE_TOLERANCE
    }
}

/// Result of [`NeuralNetwork::gradient_check`], one entry per parameter in
/// layer and index order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradientCheckReport {
    pub entries: Vec<GradientCheckEntry>,
}

impl GradientCheckReport {
    pub fn max_relative_error(&self) -> f64 {
        self.entries
            .iter()
            .map(|entry| entry.relative_error)
            .fold(0.0, f64::max)
    }

    /// True when every entry passes at `tolerance`.
    pub fn passes(&self, tolerance: f64) -> bool {
        self.entries.iter().all(|entry| entry.passes(tolerance))
    }

    pub fn failures(&self, tolerance: f64) -> Vec<GradientCheckEntry> {
        self.entries
            .iter()
            .filter(|entry| !entry.passes(tolerance))
            .copied()
            .collect()
    }
}

impl NeuralNetwork {
    /// Compares analytic and numeric gradients on one random sample.
    ///
    /// The input is drawn from a standard normal distribution and the desired
    /// output uniformly from `[0, 1)`. Accumulated gradients are cleared before
    /// and after the check, and all parameters are left unchanged.
    pub fn gradient_check(&mut self, rng: &mut SimpleRng) -> GradientCheckReport {
        let input_size = self.input_shape().size();
        let output_size = self.output_shape().size();
        let input = Matrix::random_normal(input_size, 1, rng);
        let desired: Vec<f64> = (0..output_size).map(|_| rng.next_f64()).collect();
        let sample = Sample::new(input, Matrix::from_vec(output_size, 1, desired));

        self.clear_gradients();
        self.accumulate_gradients(&sample);

        let mut report = GradientCheckReport::default();
        for layer_index in 0..self.layers().len() {
            for parameter in 0..self.layers()[layer_index].parameter_count() {
                let layer = &self.layers()[layer_index];
                let Some(analytic) = layer.total_gradient(parameter) else {
                    panic!(
                        "Layer {} ({}) produced no gradient for parameter {}",
                        layer_index,
                        layer.name(),
                        parameter
                    );
                };
                let original = layer.parameter(parameter);

                self.layers_mut()[layer_index].set_parameter(parameter, original + EPSILON);
                let cost_plus = self.cost(&sample);
                self.layers_mut()[layer_index].set_parameter(parameter, original - EPSILON);
                let cost_minus = self.cost(&sample);
                self.layers_mut()[layer_index].set_parameter(parameter, original);

                let numeric = (cost_plus - cost_minus) / (2.0 * EPSILON);
                let entry = GradientCheckEntry::new(layer_index, parameter, numeric, analytic);
                debug!(
                    "Layer {} parameter {}: numeric {:.10} analytic {:.10} relative error {:.3e}",
                    entry.layer,
                    entry.parameter,
                    entry.numeric,
                    entry.analytic,
                    entry.relative_error
                );
                report.entries.push(entry);
            }
        }

        self.clear_gradients();
        report
    }
}
