//! Max pooling layer implementation

use crate::layers::{assert_maps_match, Layer, LayerShape};
use crate::matrix::Matrix;
use crate::utils::rng::SimpleRng;

/// Max pooling over non-overlapping regions.
///
/// Each `region_rows x region_columns` block of every feature map is reduced
/// to its maximum. Backward routes each output error to the position the
/// maximum came from; every other input position receives zero.
///
/// The layer has no parameters.
pub struct MaxPoolingLayer {
    region_rows: usize,
    region_columns: usize,
    input_shape: Option<LayerShape>,
    // Absolute (row, column) of every maximum, per feature in row-major output order.
    max_positions: Option<Vec<Vec<(usize, usize)>>>,
}

impl MaxPoolingLayer {
    pub fn new(region_rows: usize, region_columns: usize) -> Self {
        assert!(
            region_rows > 0 && region_columns > 0,
            "Pooling region must not be empty"
        );
        Self {
            region_rows,
            region_columns,
            input_shape: None,
            max_positions: None,
        }
    }

    pub fn region(&self) -> (usize, usize) {
        (self.region_rows, self.region_columns)
    }

    fn shape_after(&self, input_shape: LayerShape) -> LayerShape {
        LayerShape::new(
            input_shape.features,
            input_shape.rows / self.region_rows,
            input_shape.columns / self.region_columns,
        )
    }
}

impl Layer for MaxPoolingLayer {
    fn name(&self) -> &'static str {
        "max_pooling"
    }

    fn connect(&mut self, input_shape: LayerShape, _rng: &mut SimpleRng) -> LayerShape {
        assert!(
            input_shape.rows % self.region_rows == 0
                && input_shape.columns % self.region_columns == 0,
            "Pooling layer incompatible to previous layer ({}x{} input, {}x{} region)",
            input_shape.rows,
            input_shape.columns,
            self.region_rows,
            self.region_columns
        );
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
            panic!("Pooling layer used before being connected");
        };
        assert_maps_match(input, input_shape, "input");
        let output_shape = self.shape_after(input_shape);

        let mut outputs = Vec::with_capacity(input.len());
        let mut positions = Vec::with_capacity(input.len());
        for map in input {
            let mut pooled = Matrix::zeros(output_shape.rows, output_shape.columns);
            let mut feature_positions =
                Vec::with_capacity(output_shape.rows * output_shape.columns);
            for row in 0..output_shape.rows {
                for column in 0..output_shape.columns {
                    let row_start = row * self.region_rows;
                    let column_start = column * self.region_columns;
                    let (value, max_row, max_column) = map.max_value_and_index_of_region(
                        row_start,
                        column_start,
                        self.region_columns,
                        self.region_rows,
                    );
                    pooled[(row, column)] = value;
                    feature_positions.push((row_start + max_row, column_start + max_column));
                }
            }
            outputs.push(pooled);
            positions.push(feature_positions);
        }

        self.max_positions = Some(positions);
        outputs
    }

    fn backward(&mut self, output_error: &[Matrix]) -> Vec<Matrix> {
        let Some(positions) = self.max_positions.take() else {
            panic!("Cannot backpropagate without previous forward propagation.");
        };
        let Some(input_shape) = self.input_shape else {
            panic!("Pooling layer used before being connected");
        };
        assert_maps_match(output_error, self.shape_after(input_shape), "output error");

        output_error
            .iter()
            .zip(&positions)
            .map(|(error, feature_positions)| {
                let mut input_error = Matrix::zeros(input_shape.rows, input_shape.columns);
                for (&value, &position) in error.elements().iter().zip(feature_positions) {
                    input_error[position] = value;
                }
                input_error
            })
            .collect()
    }

    fn adjust_parameters(&mut self, _step: &dyn Fn(&Matrix) -> Matrix) {}

    fn clear_gradients(&mut self) {}

    fn parameter_count(&self) -> usize {
        0
    }

    fn parameter(&self, index: usize) -> f64 {
        panic!("Pooling layer has no parameters (requested index {})", index);
    }

    fn set_parameter(&mut self, index: usize, _value: f64) {
        panic!("Pooling layer has no parameters (requested index {})", index);
    }

    fn total_gradient(&self, _index: usize) -> Option<f64> {
        None
    }
}
