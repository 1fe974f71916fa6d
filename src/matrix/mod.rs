//! Dense row-major matrices of `f64`
//!
//! `Matrix` is the value type every layer consumes and produces. Arithmetic
//! returns new matrices (see [`ops`]); the only in-place mutations are element
//! assignment through `IndexMut` and the explicit reversal and rotation methods
//! used to flip convolution kernels.
//!
//! Shape mismatches are programmer errors: shapes follow entirely from the
//! network configuration, so every operation asserts its preconditions and
//! panics on violation.

pub mod convolution;
pub mod ops;

use crate::utils::rng::SimpleRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

pub use convolution::{convolute_full_kernel, convolute_full_overlap, convolute_valid_only};

/// Orientation of a vector-shaped matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorShape {
    /// `n x 1`
    Column,
    /// `1 x n`
    Row,
}

/// Direction for [`Matrix::rotate_90`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

/// Dense 2D matrix stored in row-major order.
///
/// Invariant: `elements.len() == rows * columns`.
///
/// Serializes as the `Rows` / `Columns` / `Elements` triple used by the
/// persistence format. Deserializing rejects records whose element count does
/// not match the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", try_from = "MatrixRecord")]
pub struct Matrix {
    rows: usize,
    columns: usize,
    elements: Vec<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MatrixRecord {
    rows: usize,
    columns: usize,
    elements: Vec<f64>,
}

impl TryFrom<MatrixRecord> for Matrix {
    type Error = String;

    fn try_from(record: MatrixRecord) -> Result<Self, Self::Error> {
        if record.rows.checked_mul(record.columns) != Some(record.elements.len()) {
            return Err(format!(
                "{} elements do not fill a {}x{} matrix",
                record.elements.len(),
                record.rows,
                record.columns
            ));
        }
        Ok(Matrix {
            rows: record.rows,
            columns: record.columns,
            elements: record.elements,
        })
    }
}

impl Matrix {
    /// Matrix of the given shape with every element set to `value`.
    pub fn new(rows: usize, columns: usize, value: f64) -> Self {
        Self {
            rows,
            columns,
            elements: vec![value; rows * columns],
        }
    }

    pub fn zeros(rows: usize, columns: usize) -> Self {
        Self::new(rows, columns, 0.0)
    }

    /// Matrix of the given shape holding `elements` in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `elements.len() != rows * columns`.
    pub fn from_vec(rows: usize, columns: usize, elements: Vec<f64>) -> Self {
        assert_eq!(
            rows.checked_mul(columns),
            Some(elements.len()),
            "Element count {} does not match shape {}x{}",
            elements.len(),
            rows,
            columns
        );
        Self {
            rows,
            columns,
            elements,
        }
    }

    /// Matrix filled with the whole numbers `1.0, 2.0, ...` in row-major order.
    pub fn sequence(rows: usize, columns: usize) -> Self {
        let elements = (0..rows * columns).map(|i| (i + 1) as f64).collect();
        Self::from_vec(rows, columns, elements)
    }

    /// Row or column vector holding `values`.
    pub fn vector(shape: VectorShape, values: Vec<f64>) -> Self {
        let len = values.len();
        match shape {
            VectorShape::Column => Self::from_vec(len, 1, values),
            VectorShape::Row => Self::from_vec(1, len, values),
        }
    }

    /// One-hot vector ("versor") of dimension `len` with `component` set to 1.0.
    pub fn versor(component: usize, shape: VectorShape, len: usize) -> Self {
        assert!(
            component < len,
            "Versor component {} out of range for dimension {}",
            component,
            len
        );
        let mut values = vec![0.0; len];
        values[component] = 1.0;
        Self::vector(shape, values)
    }

    /// `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut matrix = Self::zeros(n, n);
        for i in 0..n {
            matrix[(i, i)] = 1.0;
        }
        matrix
    }

    /// Matrix with the shape of `model` and every element set to `value`.
    pub fn mirror_shape(model: &Matrix, value: f64) -> Self {
        Self::new(model.rows, model.columns, value)
    }

    /// Matrix of standard normal draws.
    pub fn random_normal(rows: usize, columns: usize, rng: &mut SimpleRng) -> Self {
        let elements = (0..rows * columns).map(|_| rng.next_normal()).collect();
        Self::from_vec(rows, columns, elements)
    }

    /// Concatenates the elements of `matrices` in order into one vector.
    pub fn flatten(matrices: &[Matrix], shape: VectorShape) -> Self {
        let values = matrices
            .iter()
            .flat_map(|m| m.elements.iter().copied())
            .collect();
        Self::vector(shape, values)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// True if one of the dimensions equals 1.
    pub fn is_vector(&self) -> bool {
        self.rows == 1 || self.columns == 1
    }

    pub fn elements(&self) -> &[f64] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<f64> {
        self.elements
    }

    /// Element at `(row, column)`, or `None` when out of range.
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        if row < self.rows && column < self.columns {
            Some(self.elements[row * self.columns + column])
        } else {
            None
        }
    }

    /// Returns the `columns x rows` matrix with `result[(i, j)] = self[(j, i)]`.
    pub fn transpose(&self) -> Matrix {
        let mut result = Matrix::zeros(self.columns, self.rows);
        for row in 0..self.rows {
            for column in 0..self.columns {
                result.elements[column * self.rows + row] =
                    self.elements[row * self.columns + column];
            }
        }
        result
    }

    /// Applies `f` to every element.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Matrix {
        Matrix {
            rows: self.rows,
            columns: self.columns,
            elements: self.elements.iter().map(|&x| f(x)).collect(),
        }
    }

    pub fn sum(&self) -> f64 {
        self.elements.iter().sum()
    }

    /// Element-wise exponential.
    pub fn exp(&self) -> Matrix {
        self.map(f64::exp)
    }

    /// Adds `scalar` to every element.
    pub fn add_scalar(&self, scalar: f64) -> Matrix {
        self.map(|x| scalar + x)
    }

    /// Returns `scalar - self` element-wise.
    pub fn scalar_sub(&self, scalar: f64) -> Matrix {
        self.map(|x| scalar - x)
    }

    /// Returns `scalar / self` element-wise.
    pub fn scalar_div(&self, scalar: f64) -> Matrix {
        self.map(|x| scalar / x)
    }

    /// Hadamard (element-wise) product.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn hadamard(&self, other: &Matrix) -> Matrix {
        self.assert_same_shape(other, "calculate the Hadamard product of");
        Matrix {
            rows: self.rows,
            columns: self.columns,
            elements: self
                .elements
                .iter()
                .zip(&other.elements)
                .map(|(a, b)| a * b)
                .collect(),
        }
    }

    /// Sum of the element-wise products of two equally shaped matrices.
    pub fn dot(&self, other: &Matrix) -> f64 {
        self.assert_same_shape(other, "take the dot product of");
        self.elements
            .iter()
            .zip(&other.elements)
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Maximum element and its `(row, column)`; ties resolve to the first
    /// occurrence in row-major order.
    pub fn max_value_and_index(&self) -> (f64, usize, usize) {
        self.max_value_and_index_of_region(0, 0, self.columns, self.rows)
    }

    /// `(row, column)` of the maximum element.
    pub fn max_index(&self) -> (usize, usize) {
        let (_, row, column) = self.max_value_and_index();
        (row, column)
    }

    /// Maximum of the `height x width` region starting at
    /// `(row_start, column_start)`. The returned index is relative to the region.
    pub fn max_value_and_index_of_region(
        &self,
        row_start: usize,
        column_start: usize,
        width: usize,
        height: usize,
    ) -> (f64, usize, usize) {
        assert!(width > 0 && height > 0, "Cannot take the maximum of an empty region");
        assert!(
            row_start + height <= self.rows && column_start + width <= self.columns,
            "Region {}x{} at ({}, {}) exceeds {}x{} matrix",
            height,
            width,
            row_start,
            column_start,
            self.rows,
            self.columns
        );
        let mut best = (self[(row_start, column_start)], 0, 0);
        for row in 0..height {
            for column in 0..width {
                let value = self[(row_start + row, column_start + column)];
                if value > best.0 {
                    best = (value, row, column);
                }
            }
        }
        best
    }

    /// Interior region left after cutting the given border widths.
    ///
    /// # Panics
    ///
    /// Panics if the remaining region has no rows or no columns.
    pub fn submatrix(&self, top: usize, bottom: usize, left: usize, right: usize) -> Matrix {
        assert!(
            top + bottom < self.rows && left + right < self.columns,
            "Cannot cut borders ({}, {}, {}, {}) from a {}x{} matrix",
            top,
            bottom,
            left,
            right,
            self.rows,
            self.columns
        );
        let rows = self.rows - top - bottom;
        let columns = self.columns - left - right;
        let mut elements = Vec::with_capacity(rows * columns);
        for row in top..top + rows {
            let start = row * self.columns + left;
            elements.extend_from_slice(&self.elements[start..start + columns]);
        }
        Matrix::from_vec(rows, columns, elements)
    }

    /// Copy surrounded by `vertical` zero rows above and below and `horizontal`
    /// zero columns left and right.
    pub fn zero_padded(&self, vertical: usize, horizontal: usize) -> Matrix {
        let columns = self.columns + 2 * horizontal;
        let mut result = Matrix::zeros(self.rows + 2 * vertical, columns);
        for row in 0..self.rows {
            let start = (row + vertical) * columns + horizontal;
            result.elements[start..start + self.columns]
                .copy_from_slice(&self.elements[row * self.columns..(row + 1) * self.columns]);
        }
        result
    }

    /// Same elements reshaped into a row or column vector.
    pub fn to_vector(&self, shape: VectorShape) -> Matrix {
        Matrix::vector(shape, self.elements.clone())
    }

    /// Reverses the order of the elements within each row, in place.
    pub fn reverse_rows(&mut self) {
        if self.columns == 0 {
            return;
        }
        for row in self.elements.chunks_exact_mut(self.columns) {
            row.reverse();
        }
    }

    /// Reverses the order of the elements within each column, in place.
    pub fn reverse_columns(&mut self) {
        for row in 0..self.rows / 2 {
            let mirrored = self.rows - 1 - row;
            for column in 0..self.columns {
                self.elements
                    .swap(row * self.columns + column, mirrored * self.columns + column);
            }
        }
    }

    /// Rotates by 90 degrees in place; the shape becomes `columns x rows`.
    pub fn rotate_90(&mut self, direction: RotationDirection) {
        *self = self.transpose();
        match direction {
            RotationDirection::Clockwise => self.reverse_rows(),
            RotationDirection::CounterClockwise => self.reverse_columns(),
        }
    }

    /// Rotates by 180 degrees in place.
    pub fn rotate_180(&mut self) {
        self.reverse_rows();
        self.reverse_columns();
    }

    pub(crate) fn assert_same_shape(&self, other: &Matrix, action: &str) {
        assert!(
            self.rows == other.rows && self.columns == other.columns,
            "Trying to {} matrices of different sizes ({}x{} and {}x{})",
            action,
            self.rows,
            self.columns,
            other.rows,
            other.columns
        );
    }

    fn assert_index(&self, row: usize, column: usize) {
        assert!(
            row < self.rows && column < self.columns,
            "Index ({}, {}) out of range for {}x{} matrix",
            row,
            column,
            self.rows,
            self.columns
        );
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, column): (usize, usize)) -> &f64 {
        self.assert_index(row, column);
        &self.elements[row * self.columns + column]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, column): (usize, usize)) -> &mut f64 {
        self.assert_index(row, column);
        &mut self.elements[row * self.columns + column]
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns == 0 {
            return Ok(());
        }
        for row in self.elements.chunks_exact(self.columns) {
            let contents: Vec<String> = row.iter().map(|x| x.to_string()).collect();
            writeln!(f, "({})", contents.join("\t"))?;
        }
        Ok(())
    }
}
