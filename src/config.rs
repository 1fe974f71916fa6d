//! Configuration structures for training
//!
//! This module provides the training hyperparameters read from JSON files:
//! epoch count, mini-batch size, learning rate and an optional random seed.

use crate::error::{NetworkError, Result};
use crate::training::TrainingOptions;
use serde::Deserialize;
use std::fs;

/// Configuration for a stochastic gradient descent run.
///
/// When `seed` is absent, binaries seed the generator from the clock.
///
/// # Example
///
/// ```json
/// {
///   "epochs": 30,
///   "mini_batch_size": 10,
///   "learning_rate": 3.0,
///   "seed": 42
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainingConfig {
    /// Number of passes over the training set
    pub epochs: usize,

    /// Samples per gradient step; a trailing smaller batch is skipped
    pub mini_batch_size: usize,

    /// Step size applied to the batch-averaged gradient
    pub learning_rate: f64,

    /// Seed for weight initialisation and shuffling
    pub seed: Option<u64>,
}

impl TrainingConfig {
    pub fn options(&self) -> TrainingOptions {
        TrainingOptions {
            epochs: self.epochs,
            mini_batch_size: self.mini_batch_size,
            learning_rate: self.learning_rate,
        }
    }
}

/// Loads a training configuration from a JSON file.
///
/// Reads the file at `path`, deserializes it into a `TrainingConfig` and
/// validates the values.
///
/// # Returns
///
/// `Ok(TrainingConfig)` on success, or an error if the file cannot be read,
/// the JSON is invalid or a value is out of range.
///
/// # Examples
///
/// ```no_run
/// use convnet_engine::config::load_config;
///
/// let cfg = load_config("config/training.json").unwrap();
/// assert!(cfg.mini_batch_size > 0);
/// ```
pub fn load_config(path: &str) -> Result<TrainingConfig> {
    let contents = fs::read_to_string(path).map_err(|e| NetworkError::from_open(e, path))?;
    let config: TrainingConfig = serde_json::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &TrainingConfig) -> Result<()> {
    if config.epochs == 0 {
        return Err(NetworkError::invalid_config("epochs must be greater than 0"));
    }

    if config.mini_batch_size == 0 {
        return Err(NetworkError::invalid_config(
            "mini_batch_size must be greater than 0",
        ));
    }

    if !config.learning_rate.is_finite() || config.learning_rate <= 0.0 {
        return Err(NetworkError::invalid_config(format!(
            "learning_rate must be a positive number (got {})",
            config.learning_rate
        )));
    }

    Ok(())
}
