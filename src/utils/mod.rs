//! Shared utilities for neural network implementations
//!
//! This module provides common utilities like random number generation,
//! activation functions, and the shuffle used by the training loop.

pub mod activations;
pub mod rng;
pub mod shuffle;

pub use activations::Activation;
pub use rng::SimpleRng;
pub use shuffle::shuffle;
