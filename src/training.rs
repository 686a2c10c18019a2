use std::time::Instant;

use ndarray::Array2;
use tracing::{debug, info, instrument, warn};

use crate::config::TrainingConfig;
use crate::error::{LstmError, Result};
use crate::matrix::Matrix;
use crate::models::rnn::{Batches, RNN};

/// Training metrics tracked during training
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingMetrics {
    pub epoch: usize,
    /// Mean per-sequence loss for the epoch.
    pub train_loss: f32,
    pub accuracy: f32,
    pub time_elapsed: f64,
}

/// Why a training run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `max_epochs` were completed.
    EpochLimit,
    /// The epoch loss fell below `error_threshold`.
    Converged,
    /// The caller's `should_continue` check returned false.
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub stop_reason: StopReason,
    pub epochs_completed: usize,
    pub final_loss: Option<f32>,
}

/// Drives an [`RNN`] over a corpus of one-hot sequences.
pub struct Trainer {
    pub network: RNN,
    pub config: TrainingConfig,
    pub metrics_history: Vec<TrainingMetrics>,
}

impl Trainer {
    pub fn new(network: RNN) -> Self {
        Trainer {
            network,
            config: TrainingConfig::default(),
            metrics_history: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: TrainingConfig) -> Self {
        self.config = config;
        self
    }

    /// Trains until the epoch limit or the error threshold is reached.
    pub fn train(&mut self, corpus: &[Vec<Matrix>]) -> Result<TrainingOutcome> {
        self.train_with(corpus, || true)
    }

    /// Trains with a cooperative cancellation check polled between batches.
    ///
    /// Every epoch visits each sequence in corpus order, each from a zero
    /// state with its own backward pass and Adam step. Sequences too short
    /// to form a batch are skipped with a warning. A cancelled epoch is
    /// rolled back entirely: the network returns to its state at the start
    /// of that epoch.
    #[instrument(skip(self, corpus, should_continue), fields(sequences = corpus.len()))]
    pub fn train_with<F>(&mut self, corpus: &[Vec<Matrix>], mut should_continue: F) -> Result<TrainingOutcome>
    where
        F: FnMut() -> bool,
    {
        self.config.validate()?;
        let prepared = self.prepare(corpus)?;

        info!(
            epochs = self.config.max_epochs,
            sequences = prepared.len(),
            "starting training"
        );

        let mut outcome = TrainingOutcome {
            stop_reason: StopReason::EpochLimit,
            epochs_completed: 0,
            final_loss: None,
        };

        'epochs: for epoch in 0..self.config.max_epochs {
            let start_time = Instant::now();
            let checkpoint = self.network.clone();
            let mut epoch_loss = 0.0;
            let mut epoch_accuracy = 0.0;

            for (index, batches) in prepared.iter().enumerate() {
                match self.network.train_epoch(batches, &mut should_continue)? {
                    Some(report) => {
                        debug!(epoch, sequence = index, loss = report.loss, "sequence trained");
                        epoch_loss += report.loss;
                        epoch_accuracy += report.accuracy;
                    }
                    None => {
                        info!(epoch, sequence = index, "training cancelled");
                        self.network = checkpoint;
                        outcome.stop_reason = StopReason::Cancelled;
                        break 'epochs;
                    }
                }
            }

            epoch_loss /= prepared.len() as f32;
            epoch_accuracy /= prepared.len() as f32;
            let time_elapsed = start_time.elapsed().as_secs_f64();

            self.metrics_history.push(TrainingMetrics {
                epoch,
                train_loss: epoch_loss,
                accuracy: epoch_accuracy,
                time_elapsed,
            });
            outcome.epochs_completed = epoch + 1;
            outcome.final_loss = Some(epoch_loss);

            if self.config.print_every > 0 && epoch % self.config.print_every == 0 {
                info!(epoch, loss = epoch_loss, accuracy = epoch_accuracy, time_elapsed, "epoch finished");
            }

            if epoch + 1 >= self.config.min_epochs && epoch_loss < self.config.error_threshold {
                info!(epoch, loss = epoch_loss, threshold = self.config.error_threshold, "error threshold reached");
                outcome.stop_reason = StopReason::Converged;
                break;
            }
        }

        info!(epochs = outcome.epochs_completed, reason = ?outcome.stop_reason, "training completed");
        Ok(outcome)
    }

    fn prepare(&self, corpus: &[Vec<Matrix>]) -> Result<Vec<Batches>> {
        let mut prepared = Vec::with_capacity(corpus.len());
        for (index, sequence) in corpus.iter().enumerate() {
            match self.network.build_batches(sequence) {
                Ok(batches) => prepared.push(batches),
                Err(LstmError::InsufficientData(reason)) => {
                    warn!(sequence = index, %reason, "skipping sequence");
                }
                Err(err) => return Err(err),
            }
        }
        if prepared.is_empty() {
            return Err(LstmError::InsufficientData(
                "no sequence in the corpus is long enough to train on".to_string(),
            ));
        }
        Ok(prepared)
    }

    pub fn get_latest_metrics(&self) -> Option<&TrainingMetrics> {
        self.metrics_history.last()
    }

    pub fn get_metrics_history(&self) -> &[TrainingMetrics] {
        &self.metrics_history
    }

    /// Loss curve as an `epochs × 2` array of `(loss, accuracy)` rows.
    pub fn history_array(&self) -> Array2<f32> {
        let mut history = Array2::zeros((self.metrics_history.len(), 2));
        for (i, metrics) in self.metrics_history.iter().enumerate() {
            history[[i, 0]] = metrics.train_loss;
            history[[i, 1]] = metrics.accuracy;
        }
        history
    }
}
