//! Layer trait definition for neural network layers
//!
//! This module defines the core Layer trait that all layer types must implement.
//! The trait provides a common interface for forward propagation, backward
//! propagation, parameter updates and index-based parameter access.

use crate::layers::LayerShape;
use crate::matrix::Matrix;
use crate::utils::rng::SimpleRng;

/// Core trait for neural network layers.
///
/// All layer types (fully connected, convolution, max pooling) implement this
/// trait so that the network, the training loop and the gradient checker can
/// drive any layer without knowing its concrete type.
///
/// Data flows between layers as a slice of feature maps, one `Matrix` per
/// feature (see [`LayerShape`]).
///
/// # Lifecycle
///
/// 1. [`connect`](Layer::connect) assigns the input shape and initialises parameters.
/// 2. [`forward`](Layer::forward) caches the intermediates of one sample.
/// 3. [`backward`](Layer::backward) consumes that cache and adds the sample's
///    parameter gradients to the layer's total gradients.
/// 4. [`adjust_parameters`](Layer::adjust_parameters) applies a step computed from
///    the total gradients and clears them.
///
/// # Example
///
/// ```ignore
/// let output_shape = layer.connect(LayerShape::new(1, 6, 6), &mut rng);
/// let output = layer.forward(&[input]);
/// let input_error = layer.backward(&output_error);
/// layer.adjust_parameters(&|gradient| -gradient * learning_rate);
/// ```
pub trait Layer {
    /// Short layer type name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Connects the layer to the output of its predecessor.
    ///
    /// Stores `input_shape`, initialises any parameters that were not supplied
    /// explicitly and returns this layer's output shape.
    ///
    /// # Panics
    ///
    /// Panics if the layer cannot accept `input_shape`.
    fn connect(&mut self, input_shape: LayerShape, rng: &mut SimpleRng) -> LayerShape;

    /// Input shape, once connected.
    fn input_shape(&self) -> Option<LayerShape>;

    /// Output shape, once connected.
    fn output_shape(&self) -> Option<LayerShape>;

    /// Forward propagation of one sample.
    ///
    /// Caches whatever [`backward`](Layer::backward) needs for this sample.
    ///
    /// # Panics
    ///
    /// Panics if the input does not match the connected input shape.
    fn forward(&mut self, input: &[Matrix]) -> Vec<Matrix>;

    /// Backward propagation of the error in this layer's output.
    ///
    /// Adds the parameter gradients for the most recent forward pass to the
    /// total gradients and returns the error in this layer's input, shaped like
    /// the input.
    ///
    /// # Panics
    ///
    /// Panics if no forward pass has happened since the last backward pass.
    fn backward(&mut self, output_error: &[Matrix]) -> Vec<Matrix>;

    /// Updates every parameter matrix as `param = param + step(total_gradient)`
    /// and resets the total gradients.
    ///
    /// # Panics
    ///
    /// Panics if a layer with parameters has no accumulated gradients.
    fn adjust_parameters(&mut self, step: &dyn Fn(&Matrix) -> Matrix);

    /// Drops any accumulated gradients without touching the parameters.
    fn clear_gradients(&mut self);

    /// Number of trainable parameters.
    fn parameter_count(&self) -> usize;

    /// Parameter at a flat index in `0..parameter_count()`.
    ///
    /// Biases come first, then weights in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    fn parameter(&self, index: usize) -> f64;

    /// Overwrites the parameter at `index`, using the same indexing as
    /// [`parameter`](Layer::parameter).
    fn set_parameter(&mut self, index: usize, value: f64);

    /// Accumulated gradient of the parameter at `index`, or `None` when no
    /// gradients have been accumulated.
    fn total_gradient(&self, index: usize) -> Option<f64>;
}
