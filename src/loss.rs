use crate::error::{LstmError, Result};
use crate::matrix::{ops, Matrix};

/// Floor applied to predicted probabilities before taking the log.
pub const PROBABILITY_FLOOR: f32 = 1e-7;

/// Loss function trait for training neural networks
pub trait LossFunction {
    /// Compute the loss between predictions and targets
    fn compute_loss(&self, predicted: &Matrix, expected: &Matrix) -> Result<f32>;

    /// Compute the gradient of the loss with respect to the pre-softmax logits
    fn compute_gradient(&self, predicted: &Matrix, expected: &Matrix) -> Result<Matrix>;
}

/// Categorical cross-entropy over softmax outputs: `-Σ expected ⊙ ln(predicted)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CategoricalCrossEntropy;

impl LossFunction for CategoricalCrossEntropy {
    fn compute_loss(&self, predicted: &Matrix, expected: &Matrix) -> Result<f32> {
        if predicted.shape() != expected.shape() {
            return Err(LstmError::shape_mismatch("cross_entropy", predicted.shape(), expected.shape()));
        }
        let mut log_predicted = ops::map(predicted, |p| p.max(PROBABILITY_FLOOR));
        log_predicted.ln();
        log_predicted.hadamard(expected)?;
        Ok(-log_predicted.sum())
    }

    fn compute_gradient(&self, predicted: &Matrix, expected: &Matrix) -> Result<Matrix> {
        ops::subtract(predicted, expected)
    }
}

/// Fraction of rows whose argmax agrees between `predicted` and `expected`.
pub fn accuracy(predicted: &Matrix, expected: &Matrix) -> Result<f32> {
    if predicted.shape() != expected.shape() {
        return Err(LstmError::shape_mismatch("accuracy", predicted.shape(), expected.shape()));
    }
    if predicted.rows() == 0 {
        return Ok(0.0);
    }
    let hits = predicted
        .argmax_rows()
        .into_iter()
        .zip(expected.argmax_rows())
        .filter(|(p, e)| p == e)
        .count();
    Ok(hits as f32 / predicted.rows() as f32)
}
