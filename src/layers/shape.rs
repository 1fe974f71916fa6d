//! Shape of the activation maps flowing between layers

use serde::Deserialize;

/// `features` activation maps of `rows x columns` each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LayerShape {
    pub features: usize,
    pub rows: usize,
    pub columns: usize,
}

impl LayerShape {
    pub fn new(features: usize, rows: usize, columns: usize) -> Self {
        Self {
            features,
            rows,
            columns,
        }
    }

    /// Single `len x 1` column vector.
    pub fn column_vector(len: usize) -> Self {
        Self::new(1, len, 1)
    }

    /// Total number of values across all features.
    pub fn size(&self) -> usize {
        self.features * self.rows * self.columns
    }
}
