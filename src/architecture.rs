//! Architecture configuration structures
//!
//! This module provides configuration structures for defining network
//! architectures in JSON, so layer stacks can be changed without code changes.

use crate::error::{NetworkError, Result};
use crate::layers::{ConvolutionLayer, FullyConnectedLayer, Layer, LayerShape, MaxPoolingLayer};
use crate::network::NeuralNetwork;
use crate::utils::activations::Activation;
use crate::utils::rng::SimpleRng;
use serde::Deserialize;
use std::fs;

/// Configuration for a single layer of the network.
///
/// Defines the layer type and its parameters. Different layer types require different fields:
///
/// - **fully_connected**: Requires `neurons`, optional `activation` (default sigmoid)
/// - **convolution**: Requires `features`, `kernel_rows` and `kernel_columns` (odd),
///   optional `activation` (default rectifier)
/// - **max_pooling**: Requires `pooling_rows` and `pooling_columns`
///
/// # Examples
///
/// ```json
/// {
///   "layer_type": "convolution",
///   "features": 3,
///   "kernel_rows": 5,
///   "kernel_columns": 5,
///   "activation": "rectifier"
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayerConfig {
    /// Type of layer: "fully_connected", "convolution" or "max_pooling"
    pub layer_type: String,

    // Fully connected layer parameters
    /// Number of neurons
    pub neurons: Option<usize>,

    // Convolution layer parameters
    /// Number of kernels (output feature maps)
    pub features: Option<usize>,
    /// Kernel height
    pub kernel_rows: Option<usize>,
    /// Kernel width
    pub kernel_columns: Option<usize>,

    // Max pooling layer parameters
    /// Pooling region height
    pub pooling_rows: Option<usize>,
    /// Pooling region width
    pub pooling_columns: Option<usize>,

    /// Activation for fully connected and convolution layers
    pub activation: Option<Activation>,
}

/// Configuration for the entire network architecture.
///
/// `input` is the shape of one sample; layers are applied in order.
///
/// # Example
///
/// ```json
/// {
///   "input": { "features": 1, "rows": 28, "columns": 28 },
///   "layers": [
///     { "layer_type": "convolution", "features": 3, "kernel_rows": 5, "kernel_columns": 5 },
///     { "layer_type": "max_pooling", "pooling_rows": 2, "pooling_columns": 2 },
///     { "layer_type": "fully_connected", "neurons": 10, "activation": "sigmoid" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ArchitectureConfig {
    /// Shape of one input sample
    pub input: LayerShape,
    /// Sequence of layer configurations defining the network structure
    pub layers: Vec<LayerConfig>,
}

/// Loads an architecture configuration from a JSON file.
///
/// Reads the file at `path`, deserializes its JSON contents into an
/// `ArchitectureConfig` and validates every layer against the shape produced
/// by the layers before it.
///
/// # Examples
///
/// ```no_run
/// use convnet_engine::architecture::load_architecture;
///
/// let arch = load_architecture("config/architectures/conv_small.json").unwrap();
/// assert!(!arch.layers.is_empty());
/// ```
pub fn load_architecture(path: &str) -> Result<ArchitectureConfig> {
    let contents = fs::read_to_string(path).map_err(|e| NetworkError::from_open(e, path))?;
    let config: ArchitectureConfig = serde_json::from_str(&contents)?;
    validate_architecture(&config)?;
    Ok(config)
}

fn required(value: Option<usize>, index: usize, kind: &str, field: &str) -> Result<usize> {
    match value {
        None => Err(NetworkError::invalid_config(format!(
            "Layer {}: {} layer requires '{}'",
            index, kind, field
        ))),
        Some(0) => Err(NetworkError::invalid_config(format!(
            "Layer {}: {} must be greater than 0",
            index, field
        ))),
        Some(value) => Ok(value),
    }
}

/// Checks one layer's fields against `input` and builds it.
///
/// Returns the boxed layer with the shape it produces. The checks run before
/// the constructor, so a bad configuration never reaches a layer assertion.
fn layer_from_config(
    layer: &LayerConfig,
    index: usize,
    input: LayerShape,
) -> Result<(Box<dyn Layer>, LayerShape)> {
    match layer.layer_type.to_lowercase().as_str() {
        "fully_connected" => {
            let neurons = required(layer.neurons, index, "Fully connected", "neurons")?;
            let activation = layer.activation.unwrap_or(Activation::Sigmoid);
            Ok((
                Box::new(FullyConnectedLayer::new(neurons, activation)),
                LayerShape::column_vector(neurons),
            ))
        }
        "convolution" => {
            let features = required(layer.features, index, "Convolution", "features")?;
            let kernel_rows = required(layer.kernel_rows, index, "Convolution", "kernel_rows")?;
            let kernel_columns =
                required(layer.kernel_columns, index, "Convolution", "kernel_columns")?;
            if kernel_rows % 2 == 0 || kernel_columns % 2 == 0 {
                return Err(NetworkError::invalid_config(format!(
                    "Layer {}: kernel dimensions must be odd (got {}x{})",
                    index, kernel_rows, kernel_columns
                )));
            }
            if input.features != 1 {
                return Err(NetworkError::invalid_config(format!(
                    "Layer {}: convolution requires a single input feature (got {})",
                    index, input.features
                )));
            }
            if kernel_rows > input.rows || kernel_columns > input.columns {
                return Err(NetworkError::invalid_config(format!(
                    "Layer {}: {}x{} kernel does not fit the {}x{} input",
                    index, kernel_rows, kernel_columns, input.rows, input.columns
                )));
            }
            let activation = layer.activation.unwrap_or(Activation::Rectifier);
            Ok((
                Box::new(ConvolutionLayer::new(
                    features,
                    kernel_rows,
                    kernel_columns,
                    activation,
                )),
                LayerShape::new(
                    features,
                    input.rows - kernel_rows + 1,
                    input.columns - kernel_columns + 1,
                ),
            ))
        }
        "max_pooling" => {
            let rows = required(layer.pooling_rows, index, "Max pooling", "pooling_rows")?;
            let columns =
                required(layer.pooling_columns, index, "Max pooling", "pooling_columns")?;
            if input.rows % rows != 0 || input.columns % columns != 0 {
                return Err(NetworkError::invalid_config(format!(
                    "Layer {}: {}x{} pooling region does not divide the {}x{} input",
                    index, rows, columns, input.rows, input.columns
                )));
            }
            Ok((
                Box::new(MaxPoolingLayer::new(rows, columns)),
                LayerShape::new(input.features, input.rows / rows, input.columns / columns),
            ))
        }
        _ => Err(NetworkError::invalid_config(format!(
            "Layer {}: Invalid layer type '{}'. \
             Must be one of: fully_connected, convolution, max_pooling",
            index, layer.layer_type
        ))),
    }
}

/// Walks the layers from the input shape, so each layer is checked against
/// the shape its predecessor actually produces.
fn build_layers(config: &ArchitectureConfig) -> Result<Vec<Box<dyn Layer>>> {
    if config.layers.is_empty() {
        return Err(NetworkError::invalid_config(
            "Architecture must have at least one layer",
        ));
    }
    let input = config.input;
    if input.features == 0 || input.rows == 0 || input.columns == 0 {
        return Err(NetworkError::invalid_config(format!(
            "Input shape must be non-empty (got {}x{}x{})",
            input.features, input.rows, input.columns
        )));
    }

    let mut layers: Vec<Box<dyn Layer>> = Vec::with_capacity(config.layers.len());
    let mut shape = input;
    for (i, layer_config) in config.layers.iter().enumerate() {
        let (layer, output) = layer_from_config(layer_config, i, shape)?;
        layers.push(layer);
        shape = output;
    }
    Ok(layers)
}

/// Validates an architecture configuration.
///
/// # Errors
///
/// Returns an error if validation fails with a descriptive message.
pub fn validate_architecture(config: &ArchitectureConfig) -> Result<()> {
    build_layers(config).map(|_| ())
}

/// Builds a network from a configuration.
///
/// Layers are validated and constructed in one pass, so connecting them
/// cannot fail.
///
/// # Examples
///
/// ```no_run
/// use convnet_engine::architecture::{build_network, load_architecture};
/// use convnet_engine::utils::rng::SimpleRng;
///
/// let config = load_architecture("config/architectures/conv_small.json").unwrap();
/// let mut rng = SimpleRng::new(42);
/// let network = build_network(&config, &mut rng).unwrap();
/// assert_eq!(network.layers().len(), config.layers.len());
/// ```
pub fn build_network(config: &ArchitectureConfig, rng: &mut SimpleRng) -> Result<NeuralNetwork> {
    let layers = build_layers(config)?;
    Ok(NeuralNetwork::new(config.input, layers, rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;

    fn fully_connected(neurons: usize) -> LayerConfig {
        LayerConfig {
            layer_type: "fully_connected".to_string(),
            neurons: Some(neurons),
            ..LayerConfig::default()
        }
    }

    fn convolution(features: usize, kernel: usize) -> LayerConfig {
        LayerConfig {
            layer_type: "convolution".to_string(),
            features: Some(features),
            kernel_rows: Some(kernel),
            kernel_columns: Some(kernel),
            ..LayerConfig::default()
        }
    }

    fn pooling(size: usize) -> LayerConfig {
        LayerConfig {
            layer_type: "max_pooling".to_string(),
            pooling_rows: Some(size),
            pooling_columns: Some(size),
            ..LayerConfig::default()
        }
    }

    fn output_shape(layer: &LayerConfig, input: LayerShape) -> Result<LayerShape> {
        layer_from_config(layer, 0, input).map(|(_, shape)| shape)
    }

    #[test]
    fn test_validate_fully_connected_layer() {
        let shape = output_shape(&fully_connected(10), LayerShape::new(1, 28, 28)).unwrap();
        assert_eq!(shape, LayerShape::column_vector(10));
    }

    #[test]
    fn test_validate_fully_connected_missing_neurons() {
        let layer = LayerConfig {
            layer_type: "fully_connected".to_string(),
            ..LayerConfig::default()
        };
        let err = layer_from_config(&layer, 2, LayerShape::column_vector(4))
            .map(|_| ())
            .unwrap_err();
        assert!(err.to_string().contains("Layer 2"));
        assert!(err.to_string().contains("neurons"));
    }

    #[test]
    fn test_validate_invalid_layer_type() {
        let layer = LayerConfig {
            layer_type: "dropout".to_string(),
            ..LayerConfig::default()
        };
        assert!(output_shape(&layer, LayerShape::column_vector(4)).is_err());
    }

    #[test]
    fn test_validate_convolution_shape() {
        let shape = output_shape(&convolution(3, 5), LayerShape::new(1, 28, 28)).unwrap();
        assert_eq!(shape, LayerShape::new(3, 24, 24));
    }

    #[test]
    fn test_validate_even_kernel() {
        assert!(output_shape(&convolution(3, 4), LayerShape::new(1, 28, 28)).is_err());
    }

    #[test]
    fn test_validate_convolution_after_convolution() {
        let config = ArchitectureConfig {
            input: LayerShape::new(1, 12, 12),
            layers: vec![convolution(2, 3), convolution(2, 3)],
        };
        let err = validate_architecture(&config).unwrap_err();
        assert!(err.to_string().contains("Layer 1"));
    }

    #[test]
    fn test_validate_pooling_divisibility() {
        let config = ArchitectureConfig {
            input: LayerShape::new(1, 9, 9),
            layers: vec![convolution(2, 3), pooling(2)],
        };
        assert!(validate_architecture(&config).is_err());

        let config = ArchitectureConfig {
            input: LayerShape::new(1, 10, 10),
            layers: vec![convolution(2, 3), pooling(2), fully_connected(3)],
        };
        assert!(validate_architecture(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_architecture() {
        let config = ArchitectureConfig {
            input: LayerShape::column_vector(4),
            layers: vec![],
        };
        assert!(validate_architecture(&config).is_err());
    }

    #[test]
    fn test_build_network_wires_shapes() {
        let config = ArchitectureConfig {
            input: LayerShape::new(1, 10, 10),
            layers: vec![convolution(2, 3), pooling(2), fully_connected(3)],
        };
        let network = build_network(&config, &mut SimpleRng::new(42)).unwrap();

        assert_eq!(network.layers().len(), 3);
        assert_eq!(network.layers()[1].output_shape(), Some(LayerShape::new(2, 4, 4)));
        assert_eq!(network.output_shape(), LayerShape::column_vector(3));
        assert_eq!(network.parameter_count(), 2 * 10 + 3 + 3 * 32);
    }

    #[test]
    fn test_deserialize_architecture() {
        let json = r#"{
            "input": { "features": 1, "rows": 6, "columns": 6 },
            "layers": [
                {
                    "layer_type": "convolution",
                    "features": 2,
                    "kernel_rows": 3,
                    "kernel_columns": 3,
                    "activation": "relu"
                },
                { "layer_type": "fully_connected", "neurons": 2 }
            ]
        }"#;
        let config: ArchitectureConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.layers[0].activation, Some(Activation::Rectifier));
        assert_eq!(config.layers[1].activation, None);
        assert!(validate_architecture(&config).is_ok());
    }

    #[test]
    fn test_built_layers_produce_validated_shapes() {
        let config = ArchitectureConfig {
            input: LayerShape::new(1, 10, 10),
            layers: vec![convolution(2, 3), pooling(2), fully_connected(3)],
        };
        let mut shape = config.input;
        let mut rng = SimpleRng::new(5);
        for (i, layer_config) in config.layers.iter().enumerate() {
            let (mut layer, expected) = layer_from_config(layer_config, i, shape).unwrap();
            assert_eq!(layer.connect(shape, &mut rng), expected);
            shape = expected;
        }
    }

    #[test]
    fn test_build_and_validate_report_the_same_error() {
        let config = ArchitectureConfig {
            input: LayerShape::new(1, 6, 6),
            layers: vec![
                convolution(1, 3),
                LayerConfig {
                    layer_type: "dropout".to_string(),
                    ..LayerConfig::default()
                },
            ],
        };
        let validated = validate_architecture(&config).unwrap_err().to_string();
        let built = build_network(&config, &mut SimpleRng::new(1))
            .map(|_| ())
            .unwrap_err()
            .to_string();
        assert_eq!(validated, built);
        assert!(built.contains("Layer 1"));
        assert!(built.contains("fully_connected, convolution, max_pooling"));
    }

    #[test]
    fn test_default_activations() {
        let mut rng = SimpleRng::new(3);
        let cases = [
            (fully_connected(1), LayerShape::column_vector(2), 0.5),
            (convolution(1, 1), LayerShape::new(1, 1, 1), 0.0),
        ];
        for (layer_config, input, expected) in cases {
            let (mut layer, _) = layer_from_config(&layer_config, 0, input).unwrap();
            layer.connect(input, &mut rng);
            for index in 0..layer.parameter_count() {
                layer.set_parameter(index, 0.0);
            }
            let output = layer.forward(&[Matrix::new(input.rows, input.columns, 1.0)]);
            assert_eq!(output[0][(0, 0)], expected);
        }
    }
}
