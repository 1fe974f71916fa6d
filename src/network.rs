//! Layered neural network
//!
//! A [`NeuralNetwork`] owns an ordered list of layers and the shape of the
//! input it accepts. Construction connects every layer to its predecessor's
//! output shape, so a network that exists is always consistently wired.

use crate::error::{NetworkError, Result};
use crate::layers::{split_into_features, to_column_vector, Layer, LayerShape};
use crate::matrix::Matrix;
use crate::training::{cost_derivative, quadratic_cost, Network, Sample};
use crate::utils::rng::SimpleRng;
use log::debug;
use serde::{Deserialize, Serialize};

/// Ordered stack of layers trained with backpropagation.
///
/// # Example
///
/// ```ignore
/// use convnet_engine::layers::{
///     ConvolutionLayer, FullyConnectedLayer, LayerShape, MaxPoolingLayer,
/// };
/// use convnet_engine::network::NeuralNetwork;
/// use convnet_engine::utils::{Activation, SimpleRng};
///
/// let mut rng = SimpleRng::new(42);
/// let network = NeuralNetwork::new(
///     LayerShape::new(1, 28, 28),
///     vec![
///         Box::new(ConvolutionLayer::new(3, 5, 5, Activation::Rectifier)),
///         Box::new(MaxPoolingLayer::new(2, 2)),
///         Box::new(FullyConnectedLayer::new(10, Activation::Sigmoid)),
///     ],
///     &mut rng,
/// );
/// ```
pub struct NeuralNetwork {
    input_shape: LayerShape,
    layers: Vec<Box<dyn Layer>>,
}

/// Flat parameter values of every layer, in layer order.
///
/// Each inner vector follows the layer's parameter index order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSnapshot {
    pub layers: Vec<Vec<f64>>,
}

impl NeuralNetwork {
    /// Connects `layers` in order, starting from `input_shape`.
    ///
    /// Layers without explicit parameters draw them from `rng`.
    ///
    /// # Panics
    ///
    /// Panics if `layers` is empty or a layer rejects its input shape.
    pub fn new(
        input_shape: LayerShape,
        mut layers: Vec<Box<dyn Layer>>,
        rng: &mut SimpleRng,
    ) -> Self {
        assert!(!layers.is_empty(), "A network needs at least one layer");
        let mut shape = input_shape;
        for (index, layer) in layers.iter_mut().enumerate() {
            shape = layer.connect(shape, rng);
            debug!(
                "Layer {} ({}): {}x{}x{}",
                index,
                layer.name(),
                shape.features,
                shape.rows,
                shape.columns
            );
        }
        Self { input_shape, layers }
    }

    pub fn input_shape(&self) -> LayerShape {
        self.input_shape
    }

    /// Shape produced by the last layer.
    pub fn output_shape(&self) -> LayerShape {
        match self.layers.last().and_then(|layer| layer.output_shape()) {
            Some(shape) => shape,
            None => panic!("Network layers are not connected"),
        }
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Box<dyn Layer>] {
        &mut self.layers
    }

    /// Total number of trainable parameters over all layers.
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.parameter_count()).sum()
    }

    /// Squared-error cost of `sample` under the current parameters.
    pub fn cost(&mut self, sample: &Sample) -> f64 {
        let predicted = self.predict(&sample.input);
        quadratic_cost(&predicted, &sample.desired_output)
    }

    /// Drops the gradients accumulated in every layer.
    pub fn clear_gradients(&mut self) {
        for layer in &mut self.layers {
            layer.clear_gradients();
        }
    }

    pub fn parameter_snapshot(&self) -> ParameterSnapshot {
        let layers = self
            .layers
            .iter()
            .map(|layer| (0..layer.parameter_count()).map(|i| layer.parameter(i)).collect())
            .collect();
        ParameterSnapshot { layers }
    }

    /// Writes every parameter of `snapshot` back into the layers.
    ///
    /// Nothing is modified unless every layer's count matches.
    pub fn restore_parameters(&mut self, snapshot: &ParameterSnapshot) -> Result<()> {
        if snapshot.layers.len() != self.layers.len() {
            return Err(NetworkError::invalid_data(format!(
                "layers ({} in snapshot, {} in network)",
                snapshot.layers.len(),
                self.layers.len()
            )));
        }
        for (index, (layer, values)) in self.layers.iter().zip(&snapshot.layers).enumerate() {
            if layer.parameter_count() != values.len() {
                return Err(NetworkError::ParameterCountMismatch {
                    layer: index,
                    expected: layer.parameter_count(),
                    actual: values.len(),
                });
            }
        }
        for (layer, values) in self.layers.iter_mut().zip(&snapshot.layers) {
            for (index, &value) in values.iter().enumerate() {
                layer.set_parameter(index, value);
            }
        }
        Ok(())
    }

    fn input_maps(&self, input: &Matrix) -> Vec<Matrix> {
        let shape = self.input_shape;
        if input.rows() == shape.rows && input.columns() == shape.columns && shape.features == 1 {
            vec![input.clone()]
        } else {
            assert_eq!(
                input.len(),
                shape.size(),
                "Wrong input size (expected {} values but received {})",
                shape.size(),
                input.len()
            );
            let map_size = shape.rows * shape.columns;
            input
                .elements()
                .chunks_exact(map_size)
                .map(|chunk| Matrix::from_vec(shape.rows, shape.columns, chunk.to_vec()))
                .collect()
        }
    }
}

impl Network for NeuralNetwork {
    /// Runs `input` through every layer and flattens the final feature maps
    /// into one column vector.
    ///
    /// `input` may be a single feature map of the input shape or any matrix
    /// holding `input_shape.size()` values in feature-major order.
    fn predict(&mut self, input: &Matrix) -> Matrix {
        let mut activations = self.input_maps(input);
        for layer in &mut self.layers {
            activations = layer.forward(&activations);
        }
        to_column_vector(&activations)
    }

    fn accumulate_gradients(&mut self, sample: &Sample) {
        let predicted = self.predict(&sample.input);
        let error = cost_derivative(&predicted, &sample.desired_output);
        let output_shape = self.output_shape();
        let mut errors = split_into_features(&error, output_shape);
        for layer in self.layers.iter_mut().rev() {
            errors = layer.backward(&errors);
        }
    }

    fn apply_gradients(&mut self, learning_rate: f64, batch_size: usize) {
        let scale = learning_rate / batch_size as f64;
        let step = move |gradient: &Matrix| -gradient * scale;
        for layer in &mut self.layers {
            layer.adjust_parameters(&step);
        }
    }
}
