//! Layer abstractions for neural networks
//!
//! This module provides the Layer trait and the three layer types a network
//! can be assembled from.

mod r#trait;
pub mod convolution;
pub mod fully_connected;
pub mod max_pooling;
pub mod shape;

// Re-export the Layer trait for convenience
pub use convolution::ConvolutionLayer;
pub use fully_connected::FullyConnectedLayer;
pub use max_pooling::MaxPoolingLayer;
pub use r#trait::Layer;
pub use shape::LayerShape;

use crate::matrix::{Matrix, VectorShape};

/// Asserts that `maps` has exactly the features and dimensions of `shape`.
pub(crate) fn assert_maps_match(maps: &[Matrix], shape: LayerShape, what: &str) {
    assert!(
        maps.len() == shape.features
            && maps
                .iter()
                .all(|m| m.rows() == shape.rows && m.columns() == shape.columns),
        "Wrong {} dimensions (expected {}x{}x{} but received {}x{}x{})",
        what,
        shape.features,
        shape.rows,
        shape.columns,
        maps.len(),
        maps.first().map_or(0, |m| m.rows()),
        maps.first().map_or(0, |m| m.columns())
    );
}

/// Flattens feature maps into one column vector; a single column vector is
/// returned as is.
pub(crate) fn to_column_vector(maps: &[Matrix]) -> Matrix {
    match maps {
        [single] if single.columns() == 1 => single.clone(),
        _ => Matrix::flatten(maps, VectorShape::Column),
    }
}

/// Splits a flat vector into `shape.features` maps of `shape.rows x shape.columns`.
pub(crate) fn split_into_features(vector: &Matrix, shape: LayerShape) -> Vec<Matrix> {
    assert_eq!(
        vector.len(),
        shape.size(),
        "Cannot split {} values into {}x{}x{} feature maps",
        vector.len(),
        shape.features,
        shape.rows,
        shape.columns
    );
    let map_size = shape.rows * shape.columns;
    vector
        .elements()
        .chunks_exact(map_size)
        .map(|chunk| Matrix::from_vec(shape.rows, shape.columns, chunk.to_vec()))
        .collect()
}
