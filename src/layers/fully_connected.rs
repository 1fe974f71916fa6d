//! Fully connected layer implementation
//!
//! This module provides a FullyConnectedLayer whose neurons are connected to
//! every value of the previous layer's output:
//! output = activation(weights × input + biases)

use crate::layers::{assert_maps_match, split_into_features, to_column_vector, Layer, LayerShape};
use crate::matrix::Matrix;
use crate::utils::activations::Activation;
use crate::utils::rng::SimpleRng;

struct ForwardCache {
    input: Matrix,
    weighted_sum: Matrix,
}

struct TotalGradients {
    biases: Matrix,
    weights: Matrix,
}

/// Fully connected layer with weights, biases and an activation.
///
/// Multi-feature or two-dimensional input is flattened into a single column
/// vector before the weights are applied.
///
/// # Fields
///
/// * `weights` - Weight matrix (neurons × flattened input size)
/// * `biases` - Bias column vector (neurons × 1)
/// * `activation` - Non-linearity applied to the weighted sums
///
/// # Example
///
/// ```ignore
/// use convnet_engine::layers::{FullyConnectedLayer, Layer, LayerShape};
/// use convnet_engine::utils::{Activation, SimpleRng};
///
/// let mut rng = SimpleRng::new(42);
/// let mut layer = FullyConnectedLayer::new(10, Activation::Sigmoid);
/// let output_shape = layer.connect(LayerShape::new(1, 28, 28), &mut rng);
/// assert_eq!(output_shape, LayerShape::column_vector(10));
/// assert_eq!(layer.parameter_count(), 10 + 10 * 784);
/// ```
pub struct FullyConnectedLayer {
    activation: Activation,
    weights: Matrix,
    biases: Matrix,
    // False until parameters were drawn in `connect` or supplied explicitly.
    has_parameters: bool,
    input_shape: Option<LayerShape>,
    cache: Option<ForwardCache>,
    total_gradients: Option<TotalGradients>,
}

impl FullyConnectedLayer {
    /// Create a layer of `neurons` neurons.
    ///
    /// Weights and biases are drawn from a standard normal distribution once
    /// the layer is connected and its input size is known.
    pub fn new(neurons: usize, activation: Activation) -> Self {
        assert!(neurons > 0, "A fully connected layer needs at least one neuron");
        Self {
            activation,
            weights: Matrix::zeros(neurons, 0),
            biases: Matrix::zeros(neurons, 1),
            has_parameters: false,
            input_shape: None,
            cache: None,
            total_gradients: None,
        }
    }

    /// Create a layer with explicit parameters.
    ///
    /// # Panics
    ///
    /// Panics unless `biases` is a column vector with one entry per row of `weights`.
    pub fn from_parameters(weights: Matrix, biases: Matrix, activation: Activation) -> Self {
        assert!(
            biases.columns() == 1 && biases.rows() == weights.rows(),
            "Biases ({}x{}) must be a column vector matching the {} weight rows",
            biases.rows(),
            biases.columns(),
            weights.rows()
        );
        Self {
            activation,
            weights,
            biases,
            has_parameters: true,
            input_shape: None,
            cache: None,
            total_gradients: None,
        }
    }

    /// Number of neurons in the layer.
    pub fn neurons(&self) -> usize {
        self.biases.rows()
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    pub fn biases(&self) -> &Matrix {
        &self.biases
    }

    fn weight_position(&self, index: usize) -> (usize, usize) {
        let offset = index - self.neurons();
        (offset / self.weights.columns(), offset % self.weights.columns())
    }

    fn assert_parameter_index(&self, index: usize) {
        assert!(
            index < self.parameter_count(),
            "Parameter index {} out of range for {} parameters",
            index,
            self.parameter_count()
        );
    }
}

impl Layer for FullyConnectedLayer {
    fn name(&self) -> &'static str {
        "fully_connected"
    }

    fn connect(&mut self, input_shape: LayerShape, rng: &mut SimpleRng) -> LayerShape {
        let input_size = input_shape.size();
        if self.has_parameters {
            assert_eq!(
                self.weights.columns(),
                input_size,
                "Weights expect {} inputs but the previous layer provides {}",
                self.weights.columns(),
                input_size
            );
        } else {
            self.biases = Matrix::random_normal(self.neurons(), 1, rng);
            self.weights = Matrix::random_normal(self.neurons(), input_size, rng);
            self.has_parameters = true;
        }
        self.input_shape = Some(input_shape);
        LayerShape::column_vector(self.neurons())
    }

    fn input_shape(&self) -> Option<LayerShape> {
        self.input_shape
    }

    fn output_shape(&self) -> Option<LayerShape> {
        self.input_shape
            .map(|_| LayerShape::column_vector(self.neurons()))
    }

    fn forward(&mut self, input: &[Matrix]) -> Vec<Matrix> {
        let Some(input_shape) = self.input_shape else {
            panic!("Fully connected layer used before being connected");
        };
        let input = to_column_vector(input);
        assert_eq!(
            input.rows(),
            input_shape.size(),
            "Wrong input size (expected {} values but received {})",
            input_shape.size(),
            input.rows()
        );
        let weighted_sum = &self.weights * &input + &self.biases;
        let output = self.activation.apply(&weighted_sum);
        self.cache = Some(ForwardCache {
            input,
            weighted_sum,
        });
        vec![output]
    }

    fn backward(&mut self, output_error: &[Matrix]) -> Vec<Matrix> {
        let Some(cache) = self.cache.take() else {
            panic!("Cannot backpropagate without previous forward propagation.");
        };
        let Some(input_shape) = self.input_shape else {
            panic!("Fully connected layer used before being connected");
        };
        assert_maps_match(
            output_error,
            LayerShape::column_vector(self.neurons()),
            "output error",
        );

        let derivative = self.activation.apply_derivative(&cache.weighted_sum);
        let delta = output_error[0].hadamard(&derivative);
        let weight_gradients = &delta * &cache.input.transpose();
        let input_error = &self.weights.transpose() * &delta;

        match self.total_gradients.as_mut() {
            Some(total) => {
                total.biases += &delta;
                total.weights += &weight_gradients;
            }
            None => {
                self.total_gradients = Some(TotalGradients {
                    biases: delta,
                    weights: weight_gradients,
                });
            }
        }

        split_into_features(&input_error, input_shape)
    }

    fn adjust_parameters(&mut self, step: &dyn Fn(&Matrix) -> Matrix) {
        let Some(total) = self.total_gradients.take() else {
            panic!("Cannot adjust parameters without previous backpropagation.");
        };
        self.biases = &self.biases + step(&total.biases);
        self.weights = &self.weights + step(&total.weights);
    }

    fn clear_gradients(&mut self) {
        self.total_gradients = None;
    }

    fn parameter_count(&self) -> usize {
        self.biases.len() + self.weights.len()
    }

    fn parameter(&self, index: usize) -> f64 {
        self.assert_parameter_index(index);
        if index < self.neurons() {
            self.biases[(index, 0)]
        } else {
            self.weights[self.weight_position(index)]
        }
    }

    fn set_parameter(&mut self, index: usize, value: f64) {
        self.assert_parameter_index(index);
        if index < self.neurons() {
            self.biases[(index, 0)] = value;
        } else {
            let position = self.weight_position(index);
            self.weights[position] = value;
        }
    }

    fn total_gradient(&self, index: usize) -> Option<f64> {
        self.assert_parameter_index(index);
        let total = self.total_gradients.as_ref()?;
        if index < self.neurons() {
            Some(total.biases[(index, 0)])
        } else {
            Some(total.weights[self.weight_position(index)])
        }
    }
}
