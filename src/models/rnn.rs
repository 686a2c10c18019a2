use std::hash::Hash;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, instrument};

use crate::config::{BpttMode, NetworkConfig};
use crate::error::{LstmError, Result};
use crate::layers::lstm_cell::{LSTMCell, LSTMCellCache};
use crate::layers::weight::Weight;
use crate::loss::{accuracy, CategoricalCrossEntropy, LossFunction};
use crate::matrix::{ops, Matrix};
use crate::optimizers::AdamConfig;
use crate::text::{sample_with_temperature, Vocabulary};

/// Backpropagation skips the first steps of every trajectory.
pub const FIRST_BACKPROP_STEP: usize = 2;

/// Teacher-forced training pairs: `targets[i]` is `inputs[i]` shifted one symbol ahead.
#[derive(Clone, Debug, Default)]
pub struct Batches {
    pub inputs: Vec<Matrix>,
    pub targets: Vec<Matrix>,
}

impl Batches {
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Everything the backward pass needs from one forward step.
#[derive(Clone, Debug)]
pub struct StepCache {
    pub cell: LSTMCellCache,
    pub predicted: Matrix,
    pub expected: Matrix,
}

/// Summary of one pass over a batch sequence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochReport {
    /// Cross-entropy summed over every step.
    pub loss: f32,
    /// Fraction of next-symbol predictions that were correct.
    pub accuracy: f32,
    pub steps: usize,
}

/// Single-layer LSTM followed by a softmax projection over the vocabulary.
#[derive(Clone, Debug, PartialEq)]
pub struct RNN {
    pub cell: LSTMCell,
    /// `hidden_size × vocab_size` projection.
    pub softmax_weight: Weight,
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub batch_size: usize,
    pub recurrence_length: usize,
    hidden_state: Matrix,
    adam: AdamConfig,
    bptt: BpttMode,
    timestep: u32,
}

impl RNN {
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let cell = LSTMCell::new(config.vocab_size, config.hidden_size, config.init_range, &mut rng);
        let softmax_weight = Weight::random(config.hidden_size, config.vocab_size, config.init_range, &mut rng);

        Ok(RNN {
            cell,
            softmax_weight,
            vocab_size: config.vocab_size,
            hidden_size: config.hidden_size,
            batch_size: config.batch_size,
            recurrence_length: config.recurrence_length,
            hidden_state: Matrix::zeros(1, config.hidden_size),
            adam: config.adam,
            bptt: config.bptt,
            timestep: 0,
        })
    }

    /// Assembles a network from stored parts (used for deserialization).
    pub fn from_parts(
        cell: LSTMCell,
        softmax_weight: Weight,
        batch_size: usize,
        recurrence_length: usize,
        adam: AdamConfig,
        bptt: BpttMode,
        timestep: u32,
    ) -> Result<Self> {
        let expected = (cell.hidden_size, cell.input_size);
        if softmax_weight.shape() != expected {
            return Err(LstmError::InvalidShape { from: softmax_weight.shape(), to: expected });
        }
        if batch_size == 0 {
            return Err(LstmError::InvalidConfig("batch_size must be positive".to_string()));
        }
        adam.validate()?;
        Ok(RNN {
            vocab_size: cell.input_size,
            hidden_size: cell.hidden_size,
            hidden_state: Matrix::zeros(1, cell.hidden_size),
            cell,
            softmax_weight,
            batch_size,
            recurrence_length,
            adam,
            bptt,
            timestep,
        })
    }

    pub fn adam_config(&self) -> &AdamConfig {
        &self.adam
    }

    /// Number of Adam steps applied so far.
    pub fn timestep(&self) -> u32 {
        self.timestep
    }

    pub fn bptt_mode(&self) -> BpttMode {
        self.bptt
    }

    pub fn set_bptt_mode(&mut self, bptt: BpttMode) {
        self.bptt = bptt;
    }

    /// Zeroes hidden and cell state for `rows` parallel sequences.
    pub fn reset_state(&mut self, rows: usize) {
        self.hidden_state = Matrix::zeros(rows, self.hidden_size);
        self.cell.reset_state(rows);
    }

    /// One step: LSTM, projection, softmax. Returns the predicted distribution.
    pub fn step(&mut self, input: &Matrix) -> Result<(Matrix, LSTMCellCache)> {
        if input.columns() != self.vocab_size {
            return Err(LstmError::shape_mismatch("step", input.shape(), (input.rows(), self.vocab_size)));
        }
        let (hidden, cache) = self.cell.forward_with_cache(input, &self.hidden_state)?;
        let mut predicted = ops::multiply(&hidden, &self.softmax_weight.value)?;
        predicted.softmax();
        self.hidden_state = hidden;
        Ok((predicted, cache))
    }

    /// Greedy generation from a fresh state: every step's argmax is fed back
    /// as the next input. Returns `steps` one-hot rows.
    pub fn forward(&mut self, initial_input: &Matrix, steps: usize) -> Result<Vec<Matrix>> {
        self.reset_state(initial_input.rows());
        let mut input = initial_input.clone();
        let mut outputs = Vec::with_capacity(steps);
        for _ in 0..steps {
            let (mut predicted, _) = self.step(&input)?;
            predicted.one_hot_rows();
            outputs.push(predicted.clone());
            input = predicted;
        }
        Ok(outputs)
    }

    /// Like [`RNN::forward`] but draws each symbol from the softmax
    /// distribution sharpened or flattened by `temperature`.
    pub fn forward_sampled<R: Rng + ?Sized>(
        &mut self,
        initial_input: &Matrix,
        steps: usize,
        temperature: f32,
        rng: &mut R,
    ) -> Result<Vec<Matrix>> {
        self.reset_state(initial_input.rows());
        let mut input = initial_input.clone();
        let mut outputs = Vec::with_capacity(steps);
        for _ in 0..steps {
            let (predicted, _) = self.step(&input)?;
            let mut next = Matrix::zeros(predicted.rows(), self.vocab_size);
            for r in 0..predicted.rows() {
                if let Some(row) = predicted.row(r) {
                    let index = sample_with_temperature(&row, temperature, rng)?;
                    next[(r, index)] = 1.0;
                }
            }
            outputs.push(next.clone());
            input = next;
        }
        Ok(outputs)
    }

    /// Generates `steps` symbols after `seed`, decoding through `vocabulary`.
    pub fn generate<S>(&mut self, vocabulary: &Vocabulary<S>, seed: &S, steps: usize) -> Result<Vec<S>>
    where
        S: Clone + Eq + Hash + std::fmt::Debug,
    {
        if vocabulary.size() != self.vocab_size {
            return Err(LstmError::shape_mismatch(
                "generate",
                (1, vocabulary.size()),
                (1, self.vocab_size),
            ));
        }
        let initial = vocabulary.encode(seed)?;
        let outputs = self.forward(&initial, steps)?;
        vocabulary.decode_sequence(&outputs)
    }

    /// Sliding windows of `batch_size` consecutive one-hot rows. Window `i`
    /// covers `sequence[i..i+batch_size]` and its target is the same window
    /// one step later.
    pub fn build_batches(&self, sequence: &[Matrix]) -> Result<Batches> {
        if let Some(bad) = sequence.iter().find(|m| m.shape() != (1, self.vocab_size)) {
            return Err(LstmError::shape_mismatch("build_batches", bad.shape(), (1, self.vocab_size)));
        }
        if sequence.len() <= self.batch_size {
            return Err(LstmError::InsufficientData(format!(
                "sequence of {} symbols cannot fill a batch of {} plus one target",
                sequence.len(),
                self.batch_size
            )));
        }

        let count = sequence.len() - self.batch_size;
        let mut batches = Batches {
            inputs: Vec::with_capacity(count),
            targets: Vec::with_capacity(count),
        };
        for i in 0..count {
            batches.inputs.push(ops::vstack_all(&sequence[i..i + self.batch_size])?);
            batches.targets.push(ops::vstack_all(&sequence[i + 1..i + 1 + self.batch_size])?);
        }
        Ok(batches)
    }

    /// Trains on one sequence for `epochs` passes. Returns the loss of each epoch.
    #[instrument(skip(self, sequence), fields(len = sequence.len()))]
    pub fn train(&mut self, sequence: &[Matrix], epochs: usize) -> Result<Vec<f32>> {
        let batches = self.build_batches(sequence)?;
        let mut losses = Vec::with_capacity(epochs);
        for epoch in 0..epochs {
            if let Some(report) = self.train_epoch(&batches, &mut || true)? {
                debug!(epoch, loss = report.loss, accuracy = report.accuracy, "epoch finished");
                losses.push(report.loss);
            }
        }
        Ok(losses)
    }

    /// One epoch: forward over every batch from a zero state, then one
    /// backward pass and one Adam step.
    ///
    /// `should_continue` is polled before each batch. If it returns false
    /// the epoch is abandoned without touching the weights and `None` is
    /// returned.
    pub fn train_epoch(
        &mut self,
        batches: &Batches,
        should_continue: &mut dyn FnMut() -> bool,
    ) -> Result<Option<EpochReport>> {
        if self.bptt == BpttMode::Full {
            return Err(LstmError::Unimplemented(
                "backpropagation through the cell-state recurrence",
            ));
        }

        self.reset_state(self.batch_size);
        let loss_fn = CategoricalCrossEntropy;
        let mut caches = Vec::with_capacity(batches.len());
        let mut total_loss = 0.0;
        let mut total_accuracy = 0.0;

        for (input, expected) in batches.inputs.iter().zip(&batches.targets) {
            if !should_continue() {
                return Ok(None);
            }
            let (predicted, cell) = self.step(input)?;
            total_loss += loss_fn.compute_loss(&predicted, expected)?;
            total_accuracy += accuracy(&predicted, expected)?;
            caches.push(StepCache { cell, predicted, expected: expected.clone() });
        }

        self.zero_gradients();
        self.backpropagate(&caches)?;
        self.update()?;
        self.zero_gradients();

        let steps = caches.len();
        Ok(Some(EpochReport {
            loss: total_loss,
            accuracy: if steps > 0 { total_accuracy / steps as f32 } else { 0.0 },
            steps,
        }))
    }

    /// Forward-only loss and accuracy over `sequence` from a zero state.
    pub fn evaluate(&mut self, sequence: &[Matrix]) -> Result<EpochReport> {
        let batches = self.build_batches(sequence)?;
        self.reset_state(self.batch_size);
        let loss_fn = CategoricalCrossEntropy;
        let mut total_loss = 0.0;
        let mut total_accuracy = 0.0;
        for (input, expected) in batches.inputs.iter().zip(&batches.targets) {
            let (predicted, _) = self.step(input)?;
            total_loss += loss_fn.compute_loss(&predicted, expected)?;
            total_accuracy += accuracy(&predicted, expected)?;
        }
        let steps = batches.len();
        Ok(EpochReport {
            loss: total_loss,
            accuracy: total_accuracy / steps as f32,
            steps,
        })
    }

    /// Accumulates gradients over `caches`, last step first.
    pub fn backpropagate(&mut self, caches: &[StepCache]) -> Result<()> {
        let loss_fn = CategoricalCrossEntropy;
        let softmax_t = ops::transpose(&self.softmax_weight.value);

        for cache in caches.iter().skip(FIRST_BACKPROP_STEP).rev() {
            let d_output = loss_fn.compute_gradient(&cache.predicted, &cache.expected)?;
            let d_hidden = ops::multiply(&d_output, &softmax_t)?;

            let d_softmax = ops::multiply(&ops::transpose(&cache.cell.hidden), &d_output)?;
            self.softmax_weight.accumulate_gradient(&d_softmax)?;

            self.cell.backward(&d_hidden, &cache.cell)?;
        }
        Ok(())
    }

    /// One Adam step on every trainable weight with the shared timestep.
    fn update(&mut self) -> Result<()> {
        self.timestep += 1;
        let (adam, t) = (self.adam, self.timestep);
        for weight in self.trainable_weights_mut() {
            weight.adam(&adam, t)?;
        }
        Ok(())
    }

    pub fn zero_gradients(&mut self) {
        for weight in self.trainable_weights_mut() {
            weight.zero_gradient();
        }
    }

    /// Gate weights in storage order followed by the softmax weight.
    pub fn trainable_weights_mut(&mut self) -> Vec<&mut Weight> {
        let mut weights = self.cell.weights_mut();
        weights.push(&mut self.softmax_weight);
        weights
    }
}
