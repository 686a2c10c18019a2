use rand::Rng;

use crate::error::{LstmError, Result};
use crate::matrix::Matrix;
use crate::optimizers::{adam_update, AdamConfig};

/// A trainable matrix plus its gradient accumulator and Adam moment buffers.
///
/// All four matrices share one shape. The gradient is accumulated across an
/// unrolled sequence and consumed by a single [`Weight::adam`] call; the
/// caller zeroes it before the next accumulation.
#[derive(Clone, Debug, PartialEq)]
pub struct Weight {
    pub value: Matrix,
    pub gradient: Matrix,
    pub moment_vector: Matrix,
    pub infinity_norm: Matrix,
}

impl Weight {
    pub fn zeros(rows: usize, columns: usize) -> Self {
        Self::from_matrix(Matrix::zeros(rows, columns))
    }

    pub fn random<R: Rng + ?Sized>(rows: usize, columns: usize, range: f32, rng: &mut R) -> Self {
        Self::from_matrix(Matrix::random(rows, columns, range, rng))
    }

    /// Wraps `value` with zeroed gradient and optimizer state.
    pub fn from_matrix(value: Matrix) -> Self {
        let (rows, columns) = value.shape();
        Weight {
            value,
            gradient: Matrix::zeros(rows, columns),
            moment_vector: Matrix::zeros(rows, columns),
            infinity_norm: Matrix::zeros(rows, columns),
        }
    }

    /// Reassembles a weight from stored buffers, checking they agree in shape.
    pub fn from_parts(
        value: Matrix,
        gradient: Matrix,
        moment_vector: Matrix,
        infinity_norm: Matrix,
    ) -> Result<Self> {
        for part in [&gradient, &moment_vector, &infinity_norm] {
            if part.shape() != value.shape() {
                return Err(LstmError::InvalidShape { from: part.shape(), to: value.shape() });
            }
        }
        Ok(Weight { value, gradient, moment_vector, infinity_norm })
    }

    pub fn shape(&self) -> (usize, usize) {
        self.value.shape()
    }

    pub fn zero_gradient(&mut self) {
        let (rows, columns) = self.shape();
        self.gradient = Matrix::zeros(rows, columns);
    }

    pub fn accumulate_gradient(&mut self, delta: &Matrix) -> Result<()> {
        self.gradient.add(delta)
    }

    /// Applies one Adam step with the accumulated gradient. Does not reset it.
    pub fn adam(&mut self, config: &AdamConfig, t: u32) -> Result<()> {
        adam_update(
            config,
            t,
            &mut self.value,
            &self.gradient,
            &mut self.moment_vector,
            &mut self.infinity_norm,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_seeded_random_is_reproducible() {
        let a = Weight::random(3, 2, 0.1, &mut StdRng::seed_from_u64(7));
        let b = Weight::random(3, 2, 0.1, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(a.value.iter().all(|v| v.abs() <= 0.1));
        assert_eq!(a.gradient, Matrix::zeros(3, 2));
    }

    #[test]
    fn test_from_parts_checks_shapes() {
        let ok = Weight::from_parts(
            Matrix::ones(2, 2),
            Matrix::zeros(2, 2),
            Matrix::zeros(2, 2),
            Matrix::zeros(2, 2),
        );
        assert!(ok.is_ok());

        let bad = Weight::from_parts(
            Matrix::ones(2, 2),
            Matrix::zeros(2, 2),
            Matrix::zeros(1, 2),
            Matrix::zeros(2, 2),
        );
        assert!(matches!(bad, Err(LstmError::InvalidShape { .. })));
    }

    #[test]
    fn test_constant_gradient_descends_monotonically() {
        let config = AdamConfig::new(0.01);
        let mut weight = Weight::from_matrix(Matrix::filled(2, 2, 1.0));
        let gradient = Matrix::from_vec(2, 2, vec![0.3, -0.3, 1e-3, -5.0]).unwrap();

        let mut previous = weight.value.clone();
        for t in 1..=200 {
            weight.zero_gradient();
            weight.accumulate_gradient(&gradient).unwrap();
            weight.adam(&config, t).unwrap();

            assert!(weight.value.is_finite());
            for (i, (now, before)) in weight.value.iter().zip(previous.iter()).enumerate() {
                let g = gradient.to_vec()[i];
                if g > 0.0 {
                    assert!(now < before, "step {} element {} did not decrease", t, i);
                } else {
                    assert!(now > before, "step {} element {} did not increase", t, i);
                }
            }
            previous = weight.value.clone();
        }
    }

    #[test]
    fn test_adam_keeps_gradient() {
        let mut weight = Weight::zeros(1, 1);
        weight.accumulate_gradient(&Matrix::ones(1, 1)).unwrap();
        weight.adam(&AdamConfig::default(), 1).unwrap();
        assert_eq!(weight.gradient, Matrix::ones(1, 1));
    }
}
