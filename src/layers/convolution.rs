//! Convolution layer implementation
//!
//! Each feature owns one odd-sized kernel and one bias. The kernel is slid over
//! the single-channel input where it fits entirely:
//! output_f = activation(convolute_valid_only(input, kernel_f) + bias_f)

use crate::layers::{assert_maps_match, Layer, LayerShape};
use crate::matrix::{convolute_full_overlap, convolute_valid_only, Matrix};
use crate::utils::activations::Activation;
use crate::utils::rng::SimpleRng;

struct ForwardCache {
    input: Matrix,
    weighted_sums: Vec<Matrix>,
}

struct TotalGradients {
    biases: Matrix,
    kernels: Vec<Matrix>,
}

/// 2D convolution layer over a single input channel.
///
/// An input of `rows x columns` produces `features` maps of
/// `(rows - kernel_rows + 1) x (columns - kernel_columns + 1)`.
///
/// # Example
///
/// ```ignore
/// use convnet_engine::layers::{ConvolutionLayer, Layer, LayerShape};
/// use convnet_engine::utils::{Activation, SimpleRng};
///
/// let mut rng = SimpleRng::new(42);
/// let mut conv = ConvolutionLayer::new(3, 5, 5, Activation::Rectifier);
/// let output_shape = conv.connect(LayerShape::new(1, 28, 28), &mut rng);
/// assert_eq!(output_shape, LayerShape::new(3, 24, 24));
/// ```
pub struct ConvolutionLayer {
    activation: Activation,
    kernel_rows: usize,
    kernel_columns: usize,
    kernels: Vec<Matrix>,
    biases: Matrix,
    has_parameters: bool,
    input_shape: Option<LayerShape>,
    cache: Option<ForwardCache>,
    total_gradients: Option<TotalGradients>,
}

fn assert_odd_kernel_size(kernel_rows: usize, kernel_columns: usize) {
    assert!(
        kernel_rows % 2 == 1 && kernel_columns % 2 == 1,
        "Kernel must have odd dimensions (got {}x{})",
        kernel_rows,
        kernel_columns
    );
}

impl ConvolutionLayer {
    /// Create a layer of `features` kernels of `kernel_rows x kernel_columns`.
    ///
    /// # Panics
    ///
    /// Panics if `features` is zero or a kernel dimension is even.
    pub fn new(
        features: usize,
        kernel_rows: usize,
        kernel_columns: usize,
        activation: Activation,
    ) -> Self {
        assert!(features > 0, "A convolution layer needs at least one feature");
        assert_odd_kernel_size(kernel_rows, kernel_columns);
        Self {
            activation,
            kernel_rows,
            kernel_columns,
            kernels: vec![Matrix::zeros(kernel_rows, kernel_columns); features],
            biases: Matrix::zeros(features, 1),
            has_parameters: false,
            input_shape: None,
            cache: None,
            total_gradients: None,
        }
    }

    /// Create a layer with explicit kernels and one bias per kernel.
    ///
    /// # Panics
    ///
    /// Panics if the kernels differ in shape, have even dimensions or do not
    /// match the number of biases.
    pub fn from_parameters(kernels: Vec<Matrix>, biases: Vec<f64>, activation: Activation) -> Self {
        assert!(!kernels.is_empty(), "A convolution layer needs at least one feature");
        assert_eq!(
            kernels.len(),
            biases.len(),
            "Got {} kernels but {} biases",
            kernels.len(),
            biases.len()
        );
        let (kernel_rows, kernel_columns) = kernels[0].shape();
        assert!(
            kernels.iter().all(|k| k.shape() == (kernel_rows, kernel_columns)),
            "All kernels must have the same dimensions"
        );
        assert_odd_kernel_size(kernel_rows, kernel_columns);
        let biases = Matrix::from_vec(biases.len(), 1, biases);
        Self {
            activation,
            kernel_rows,
            kernel_columns,
            kernels,
            biases,
            has_parameters: true,
            input_shape: None,
            cache: None,
            total_gradients: None,
        }
    }

    pub fn features(&self) -> usize {
        self.kernels.len()
    }

    pub fn kernels(&self) -> &[Matrix] {
        &self.kernels
    }

    pub fn biases(&self) -> &Matrix {
        &self.biases
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    fn kernel_size(&self) -> usize {
        self.kernel_rows * self.kernel_columns
    }

    // Maps a flat index past the biases to (feature, row, column).
    fn kernel_position(&self, index: usize) -> (usize, (usize, usize)) {
        let offset = index - self.features();
        let feature = offset / self.kernel_size();
        let within = offset % self.kernel_size();
        (
            feature,
            (within / self.kernel_columns, within % self.kernel_columns),
        )
    }

    fn assert_parameter_index(&self, index: usize) {
        assert!(
            index < self.parameter_count(),
            "Parameter index {} out of range for {} parameters",
            index,
            self.parameter_count()
        );
    }

    fn shape_after(&self, input_shape: LayerShape) -> LayerShape {
        LayerShape::new(
            self.features(),
            input_shape.rows - self.kernel_rows + 1,
            input_shape.columns - self.kernel_columns + 1,
        )
    }
}

impl Layer for ConvolutionLayer {
    fn name(&self) -> &'static str {
        "convolution"
    }

    fn connect(&mut self, input_shape: LayerShape, rng: &mut SimpleRng) -> LayerShape {
        assert_eq!(
            input_shape.features, 1,
            "Convolution layer expects a single input feature but got {}",
            input_shape.features
        );
        assert!(
            self.kernel_rows <= input_shape.rows && self.kernel_columns <= input_shape.columns,
            "Kernel ({}x{}) does not fit the {}x{} input",
            self.kernel_rows,
            self.kernel_columns,
            input_shape.rows,
            input_shape.columns
        );
        if !self.has_parameters {
            let features = self.features();
            self.biases = Matrix::random_normal(features, 1, rng);
            self.kernels = (0..features)
                .map(|_| Matrix::random_normal(self.kernel_rows, self.kernel_columns, rng))
                .collect();
            self.has_parameters = true;
        }
        self.input_shape = Some(input_shape);
        self.shape_after(input_shape)
    }

    fn input_shape(&self) -> Option<LayerShape> {
        self.input_shape
    }

    fn output_shape(&self) -> Option<LayerShape> {
        self.input_shape.map(|shape| self.shape_after(shape))
    }

    fn forward(&mut self, input: &[Matrix]) -> Vec<Matrix> {
        let Some(input_shape) = self.input_shape else {
            panic!("Convolution layer used before being connected");
        };
        assert_maps_match(input, input_shape, "input");
        let input = input[0].clone();

        let weighted_sums: Vec<Matrix> = self
            .kernels
            .iter()
            .enumerate()
            .map(|(feature, kernel)| {
                convolute_valid_only(&input, kernel).add_scalar(self.biases[(feature, 0)])
            })
            .collect();
        let output = weighted_sums
            .iter()
            .map(|sum| self.activation.apply(sum))
            .collect();

        self.cache = Some(ForwardCache {
            input,
            weighted_sums,
        });
        output
    }

    fn backward(&mut self, output_error: &[Matrix]) -> Vec<Matrix> {
        let Some(cache) = self.cache.take() else {
            panic!("Cannot backpropagate without previous forward propagation.");
        };
        let Some(input_shape) = self.input_shape else {
            panic!("Convolution layer used before being connected");
        };
        assert_maps_match(output_error, self.shape_after(input_shape), "output error");

        let mut bias_gradients = Matrix::zeros(self.features(), 1);
        let mut kernel_gradients = Vec::with_capacity(self.features());
        let mut input_error = Matrix::zeros(input_shape.rows, input_shape.columns);

        let errors = output_error.iter().zip(&cache.weighted_sums);
        for (feature, (error, weighted_sum)) in errors.enumerate() {
            let delta = error.hadamard(&self.activation.apply_derivative(weighted_sum));
            bias_gradients[(feature, 0)] = delta.sum();

            let mut gradient = Matrix::zeros(self.kernel_rows, self.kernel_columns);
            for row in 0..self.kernel_rows {
                for column in 0..self.kernel_columns {
                    let window = cache.input.submatrix(
                        row,
                        self.kernel_rows - row - 1,
                        column,
                        self.kernel_columns - column - 1,
                    );
                    gradient[(row, column)] = window.dot(&delta);
                }
            }
            kernel_gradients.push(gradient);

            let mut flipped = self.kernels[feature].clone();
            flipped.rotate_180();
            input_error += &convolute_full_overlap(&delta, &flipped);
        }

        match self.total_gradients.as_mut() {
            Some(total) => {
                total.biases += &bias_gradients;
                for (sum, gradient) in total.kernels.iter_mut().zip(&kernel_gradients) {
                    *sum += gradient;
                }
            }
            None => {
                self.total_gradients = Some(TotalGradients {
                    biases: bias_gradients,
                    kernels: kernel_gradients,
                });
            }
        }

        vec![input_error]
    }

    fn adjust_parameters(&mut self, step: &dyn Fn(&Matrix) -> Matrix) {
        let Some(total) = self.total_gradients.take() else {
            panic!("Cannot adjust parameters without previous backpropagation.");
        };
        self.biases = &self.biases + step(&total.biases);
        for (kernel, gradient) in self.kernels.iter_mut().zip(&total.kernels) {
            *kernel += &step(gradient);
        }
    }

    fn clear_gradients(&mut self) {
        self.total_gradients = None;
    }

    fn parameter_count(&self) -> usize {
        self.features() * (1 + self.kernel_size())
    }

    fn parameter(&self, index: usize) -> f64 {
        self.assert_parameter_index(index);
        if index < self.features() {
            self.biases[(index, 0)]
        } else {
            let (feature, position) = self.kernel_position(index);
            self.kernels[feature][position]
        }
    }

    fn set_parameter(&mut self, index: usize, value: f64) {
        self.assert_parameter_index(index);
        if index < self.features() {
            self.biases[(index, 0)] = value;
        } else {
            let (feature, position) = self.kernel_position(index);
            self.kernels[feature][position] = value;
        }
    }

    fn total_gradient(&self, index: usize) -> Option<f64> {
        self.assert_parameter_index(index);
        let total = self.total_gradients.as_ref()?;
        if index < self.features() {
            Some(total.biases[(index, 0)])
        } else {
            let (feature, position) = self.kernel_position(index);
            Some(total.kernels[feature][position])
        }
    }
}
