//! Convolutional Network Engine
//!
//! This library implements small neural networks from scratch: dense matrices
//! with their own product and convolution kernels, three layer types with hand
//! written backward passes, mini-batch stochastic gradient descent and a
//! numeric gradient checker.
//!
//! # Modules
//!
//! - `matrix`: Dense row-major matrices, operators and convolutions
//! - `layers`: Layer trait and implementations (FullyConnected, Convolution, MaxPooling)
//! - `network`: Layered network container, prediction and parameter snapshots
//! - `training`: Samples, the `Network` trait with the SGD loop, progress observers
//! - `gradient_check`: Finite-difference verification of backpropagation
//! - `feedforward`: Fixed sigmoid network with JSON persistence
//! - `utils`: Shared utilities (RNG, activation functions, shuffle)
//! - `config`: Training configuration structures
//! - `architecture`: Architecture configuration and network building
//! - `error`: Recoverable error type

pub mod architecture;
pub mod config;
pub mod error;
pub mod feedforward;
pub mod gradient_check;
pub mod layers;
pub mod matrix;
pub mod network;
pub mod training;
pub mod utils;

pub use error::{NetworkError, Result};
pub use matrix::Matrix;
pub use network::NeuralNetwork;
pub use training::{Network, Sample, TrainingOptions};
