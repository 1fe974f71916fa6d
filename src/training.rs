//! Mini-batch stochastic gradient descent
//!
//! The [`Network`] trait captures what the training loop needs from a model:
//! a forward pass, per-sample gradient accumulation and a parameter update.
//! `train` and `test` are provided on top of those three operations, so the
//! layered [`NeuralNetwork`](crate::network::NeuralNetwork) and the fixed
//! [`FeedforwardNetwork`](crate::feedforward::FeedforwardNetwork) share one loop.

use crate::matrix::{Matrix, VectorShape};
use crate::utils::rng::SimpleRng;
use crate::utils::shuffle::shuffle;
use log::{debug, info};

/// One training or test example.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub input: Matrix,
    pub desired_output: Matrix,
}

impl Sample {
    pub fn new(input: Matrix, desired_output: Matrix) -> Self {
        Self {
            input,
            desired_output,
        }
    }

    /// Sample whose desired output is the one-hot column vector of `label`.
    pub fn classification(input: Matrix, label: usize, classes: usize) -> Self {
        Self::new(input, Matrix::versor(label, VectorShape::Column, classes))
    }
}

/// Hyperparameters of one training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingOptions {
    pub epochs: usize,
    pub mini_batch_size: usize,
    pub learning_rate: f64,
}

/// Receives progress events while a network trains.
///
/// Observers only watch; nothing they do feeds back into the numbers.
pub trait TrainingObserver {
    fn training_started(&mut self, _options: &TrainingOptions, _batches_per_epoch: usize) {}

    fn mini_batch_finished(&mut self, _epoch: usize, _batch: usize, _batches_per_epoch: usize) {}

    /// `accuracy` is `(correct, total)` when a test set was supplied.
    fn epoch_finished(&mut self, _epoch: usize, _accuracy: Option<(usize, usize)>) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TrainingObserver for NoopObserver {}

/// Observer that reports progress through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl TrainingObserver for LogObserver {
    fn training_started(&mut self, options: &TrainingOptions, batches_per_epoch: usize) {
        info!(
            "Training for {} epochs, {} mini-batches of {} per epoch, learning rate {}",
            options.epochs, batches_per_epoch, options.mini_batch_size, options.learning_rate
        );
    }

    fn mini_batch_finished(&mut self, epoch: usize, batch: usize, batches_per_epoch: usize) {
        debug!("Epoch {}: mini-batch {}/{}", epoch + 1, batch + 1, batches_per_epoch);
    }

    fn epoch_finished(&mut self, epoch: usize, accuracy: Option<(usize, usize)>) {
        if accuracy.is_none() {
            info!("Epoch {} complete", epoch + 1);
        }
    }
}

/// A trainable model.
pub trait Network {
    /// Forward pass of one input, returned as a column vector.
    fn predict(&mut self, input: &Matrix) -> Matrix;

    /// Runs one sample forward and backward, adding its gradients of the
    /// squared-error cost to the accumulated totals.
    fn accumulate_gradients(&mut self, sample: &Sample);

    /// Steps every parameter by `-total_gradient * learning_rate / batch_size`
    /// and clears the accumulated totals.
    fn apply_gradients(&mut self, learning_rate: f64, batch_size: usize);

    /// Trains with mini-batch stochastic gradient descent.
    ///
    /// Every epoch shuffles the training set with `rng` and splits it into
    /// contiguous batches of `options.mini_batch_size`; a trailing batch that
    /// would be smaller is skipped for that epoch. When `test_set` is given,
    /// its accuracy is logged before training and after every epoch.
    ///
    /// # Panics
    ///
    /// Panics if `options.mini_batch_size` is zero.
    fn train(
        &mut self,
        training_set: &[Sample],
        options: &TrainingOptions,
        test_set: Option<&[Sample]>,
        rng: &mut SimpleRng,
        observer: &mut dyn TrainingObserver,
    ) {
        assert!(options.mini_batch_size > 0, "Mini-batch size must be positive");

        if let Some(test_set) = test_set {
            info!("Untrained: {}/{}", self.test(test_set), test_set.len());
        }

        let mut order: Vec<&Sample> = training_set.iter().collect();
        let batches_per_epoch = order.len() / options.mini_batch_size;
        observer.training_started(options, batches_per_epoch);

        for epoch in 0..options.epochs {
            shuffle(&mut order, rng);
            for (batch_index, batch) in order.chunks_exact(options.mini_batch_size).enumerate() {
                for sample in batch {
                    self.accumulate_gradients(sample);
                }
                self.apply_gradients(options.learning_rate, batch.len());
                observer.mini_batch_finished(epoch, batch_index, batches_per_epoch);
            }

            let accuracy = test_set.map(|test_set| (self.test(test_set), test_set.len()));
            if let Some((correct, total)) = accuracy {
                info!("Epoch {}: {}/{}", epoch + 1, correct, total);
            }
            observer.epoch_finished(epoch, accuracy);
        }
    }

    /// Number of samples whose largest predicted component is the largest
    /// component of the desired output.
    fn test(&mut self, test_set: &[Sample]) -> usize {
        test_set
            .iter()
            .filter(|sample| {
                self.predict(&sample.input).max_index() == sample.desired_output.max_index()
            })
            .count()
    }
}

/// Derivative of `0.5 * ||predicted - desired||^2` with respect to `predicted`.
pub fn cost_derivative(predicted: &Matrix, desired: &Matrix) -> Matrix {
    predicted - desired
}

/// Squared-error cost `0.5 * ||predicted - desired||^2`.
pub fn quadratic_cost(predicted: &Matrix, desired: &Matrix) -> f64 {
    let difference = predicted - desired;
    0.5 * difference.dot(&difference)
}
