//! Fixed-topology feedforward network with file persistence
//!
//! A [`FeedforwardNetwork`] is a stack of sigmoid fully connected layers
//! described only by its layer sizes. Its parameters can be written to and
//! read from a JSON document:
//!
//! ```json
//! {
//!   "LayerSizes": [784, 30, 10],
//!   "Weights": [{ "Rows": 30, "Columns": 784, "Elements": [...] }, ...],
//!   "Biases": [{ "Rows": 30, "Columns": 1, "Elements": [...] }, ...]
//! }
//! ```

use crate::error::{NetworkError, Result};
use crate::layers::{FullyConnectedLayer, Layer, LayerShape};
use crate::matrix::Matrix;
use crate::training::{cost_derivative, Network, Sample};
use crate::utils::activations::Activation;
use crate::utils::rng::SimpleRng;
use log::info;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Sigmoid network of fully connected layers.
///
/// # Example
///
/// ```ignore
/// use convnet_engine::feedforward::FeedforwardNetwork;
/// use convnet_engine::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let network = FeedforwardNetwork::new(&[784, 30, 10], &mut rng);
/// network.save("network.json")?;
/// let restored = FeedforwardNetwork::load("network.json")?;
/// ```
pub struct FeedforwardNetwork {
    layer_sizes: Vec<usize>,
    layers: Vec<FullyConnectedLayer>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Document<'a> {
    layer_sizes: &'a [usize],
    weights: Vec<&'a Matrix>,
    biases: Vec<&'a Matrix>,
}

impl FeedforwardNetwork {
    /// Create a network with `layer_sizes[0]` inputs and one layer per further size.
    ///
    /// # Panics
    ///
    /// Panics with fewer than two sizes or a zero size.
    pub fn new(layer_sizes: &[usize], rng: &mut SimpleRng) -> Self {
        assert!(
            layer_sizes.len() >= 2,
            "A feedforward network needs an input size and at least one layer size"
        );
        assert!(
            layer_sizes.iter().all(|&size| size > 0),
            "Layer sizes must be positive"
        );
        let layers = layer_sizes
            .windows(2)
            .map(|pair| {
                let mut layer = FullyConnectedLayer::new(pair[1], Activation::Sigmoid);
                layer.connect(LayerShape::column_vector(pair[0]), rng);
                layer
            })
            .collect();
        Self {
            layer_sizes: layer_sizes.to_vec(),
            layers,
        }
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    pub fn layers(&self) -> &[FullyConnectedLayer] {
        &self.layers
    }

    /// Writes the layer sizes, weights and biases to `path` as JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let document = Document {
            layer_sizes: &self.layer_sizes,
            weights: self.layers.iter().map(|layer| layer.weights()).collect(),
            biases: self.layers.iter().map(|layer| layer.biases()).collect(),
        };
        let json = serde_json::to_string(&document)?;
        fs::write(path.as_ref(), json)?;
        info!("Saved network {:?} to {}", self.layer_sizes, path.as_ref().display());
        Ok(())
    }

    /// Reads a network written by [`save`](FeedforwardNetwork::save).
    ///
    /// # Errors
    ///
    /// `FileNotFound` if `path` does not exist, `Json` if it is not JSON, and
    /// `InvalidData` naming the first field that is missing, ill-typed or
    /// inconsistent with `LayerSizes`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| NetworkError::from_open(e, path))?;
        let document: Value = serde_json::from_str(&contents)?;
        Self::from_document(&document)
    }

    fn from_document(document: &Value) -> Result<Self> {
        let layer_sizes = read_layer_sizes(document)?;
        let weights = read_records(document, "Weights", layer_sizes.len() - 1)?;
        let biases = read_records(document, "Biases", layer_sizes.len() - 1)?;

        let mut rng = SimpleRng::new(0);
        let mut layers = Vec::with_capacity(weights.len());
        for (i, (weights, biases)) in weights.into_iter().zip(biases).enumerate() {
            let (inputs, neurons) = (layer_sizes[i], layer_sizes[i + 1]);
            if weights.shape() != (neurons, inputs) {
                return Err(NetworkError::invalid_data(format!("Weights[{}]", i)));
            }
            if biases.shape() != (neurons, 1) {
                return Err(NetworkError::invalid_data(format!("Biases[{}]", i)));
            }
            let mut layer =
                FullyConnectedLayer::from_parameters(weights, biases, Activation::Sigmoid);
            layer.connect(LayerShape::column_vector(inputs), &mut rng);
            layers.push(layer);
        }

        Ok(Self {
            layer_sizes,
            layers,
        })
    }
}

fn read_layer_sizes(document: &Value) -> Result<Vec<usize>> {
    let invalid = || NetworkError::invalid_data("LayerSizes");
    let sizes = document
        .get("LayerSizes")
        .and_then(Value::as_array)
        .ok_or_else(invalid)?
        .iter()
        .map(|size| match size.as_u64() {
            Some(size) if size > 0 => usize::try_from(size).map_err(|_| invalid()),
            _ => Err(invalid()),
        })
        .collect::<Result<Vec<usize>>>()?;
    if sizes.len() < 2 {
        return Err(invalid());
    }
    Ok(sizes)
}

fn read_records(document: &Value, key: &str, expected: usize) -> Result<Vec<Matrix>> {
    let records = document
        .get(key)
        .and_then(Value::as_array)
        .filter(|records| records.len() == expected)
        .ok_or_else(|| NetworkError::invalid_data(key))?;
    records
        .iter()
        .enumerate()
        .map(|(i, record)| read_matrix(record, &format!("{}[{}]", key, i)))
        .collect()
}

fn read_dimension(record: &Value, field: &str, key: &str) -> Result<usize> {
    record
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|value| usize::try_from(value).ok())
        .ok_or_else(|| NetworkError::invalid_data(format!("{}.{}", field, key)))
}

fn read_matrix(record: &Value, field: &str) -> Result<Matrix> {
    let rows = read_dimension(record, field, "Rows")?;
    let columns = read_dimension(record, field, "Columns")?;
    let elements_field = format!("{}.Elements", field);
    let elements = record
        .get("Elements")
        .and_then(Value::as_array)
        .ok_or_else(|| NetworkError::invalid_data(elements_field.as_str()))?
        .iter()
        .map(|value| {
            value
                .as_f64()
                .ok_or_else(|| NetworkError::invalid_data(elements_field.as_str()))
        })
        .collect::<Result<Vec<f64>>>()?;
    if rows.checked_mul(columns) != Some(elements.len()) {
        return Err(NetworkError::invalid_data(elements_field));
    }
    Ok(Matrix::from_vec(rows, columns, elements))
}

impl Network for FeedforwardNetwork {
    fn predict(&mut self, input: &Matrix) -> Matrix {
        let mut activation = vec![input.clone()];
        for layer in &mut self.layers {
            activation = layer.forward(&activation);
        }
        activation.swap_remove(0)
    }

    fn accumulate_gradients(&mut self, sample: &Sample) {
        let predicted = self.predict(&sample.input);
        let mut error = vec![cost_derivative(&predicted, &sample.desired_output)];
        for layer in self.layers.iter_mut().rev() {
            error = layer.backward(&error);
        }
    }

    fn apply_gradients(&mut self, learning_rate: f64, batch_size: usize) {
        let scale = learning_rate / batch_size as f64;
        for layer in &mut self.layers {
            layer.adjust_parameters(&|gradient: &Matrix| -gradient * scale);
        }
    }
}
