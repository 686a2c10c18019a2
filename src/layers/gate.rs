use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{LstmError, Result};
use crate::layers::weight::Weight;
use crate::matrix::{ops, Matrix};

/// Nonlinearity applied to a gate's pre-activation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateActivation {
    Sigmoid,
    Tanh,
}

impl GateActivation {
    fn apply(self, m: &mut Matrix) {
        match self {
            GateActivation::Sigmoid => m.sigmoid(),
            GateActivation::Tanh => m.tanh(),
        }
    }

    fn derivative(self, m: &Matrix) -> Matrix {
        match self {
            GateActivation::Sigmoid => ops::dsigmoid(m),
            GateActivation::Tanh => ops::dtanh(m),
        }
    }
}

/// One LSTM gate: `value = act(x · W_in + h · W_rec + bias)`.
///
/// `input_weight` is `input_size × hidden_size`, `recurrent_weight` is
/// `hidden_size × hidden_size` and `bias` is a `1 × hidden_size` row added
/// to every batch row. `value` holds the last forward result.
#[derive(Clone, Debug, PartialEq)]
pub struct Gate {
    pub value: Matrix,
    pub input_weight: Weight,
    pub recurrent_weight: Weight,
    pub bias: Matrix,
    pub activation: GateActivation,
}

impl Gate {
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        hidden_size: usize,
        activation: GateActivation,
        init_range: f32,
        rng: &mut R,
    ) -> Self {
        Gate {
            value: Matrix::zeros(1, hidden_size),
            input_weight: Weight::random(input_size, hidden_size, init_range, rng),
            recurrent_weight: Weight::random(hidden_size, hidden_size, init_range, rng),
            bias: Matrix::zeros(1, hidden_size),
            activation,
        }
    }

    /// Reassembles a gate from stored parameters.
    pub fn from_parts(
        activation: GateActivation,
        input_weight: Weight,
        recurrent_weight: Weight,
        bias: Matrix,
    ) -> Result<Self> {
        let hidden_size = recurrent_weight.shape().0;
        let expected = [
            (input_weight.shape(), (input_weight.shape().0, hidden_size)),
            (recurrent_weight.shape(), (hidden_size, hidden_size)),
            (bias.shape(), (1, hidden_size)),
        ];
        for (actual, wanted) in expected {
            if actual != wanted {
                return Err(LstmError::InvalidShape { from: actual, to: wanted });
            }
        }
        Ok(Gate {
            value: Matrix::zeros(1, hidden_size),
            input_weight,
            recurrent_weight,
            bias,
            activation,
        })
    }

    pub fn input_size(&self) -> usize {
        self.input_weight.shape().0
    }

    pub fn hidden_size(&self) -> usize {
        self.recurrent_weight.shape().0
    }

    pub fn forward(&mut self, input: &Matrix, hidden: &Matrix) -> Result<&Matrix> {
        let mut pre = ops::multiply(input, &self.input_weight.value)?;
        pre.add(&ops::multiply(hidden, &self.recurrent_weight.value)?)?;
        pre.add_row_vector(&self.bias)?;
        self.activation.apply(&mut pre);
        self.value = pre;
        Ok(&self.value)
    }

    /// Accumulates this gate's weight gradients for one timestep.
    ///
    /// `value` is the gate activation cached at that step and `delta` the
    /// gradient flowing into it:
    /// `dW_in += xᵀ · (delta ⊙ act'(value))`,
    /// `dW_rec += deltaᵀ · (act'(value) ⊙ h_prev)`.
    pub fn accumulate_gradients(
        &mut self,
        input: &Matrix,
        prev_hidden: &Matrix,
        value: &Matrix,
        delta: &Matrix,
    ) -> Result<()> {
        let derivative = self.activation.derivative(value);

        let local = ops::hadamard(delta, &derivative)?;
        let d_input = ops::multiply(&ops::transpose(input), &local)?;
        self.input_weight.accumulate_gradient(&d_input)?;

        let scaled_hidden = ops::hadamard(&derivative, prev_hidden)?;
        let d_recurrent = ops::multiply(&ops::transpose(delta), &scaled_hidden)?;
        self.recurrent_weight.accumulate_gradient(&d_recurrent)
    }

    pub fn weights_mut(&mut self) -> [&mut Weight; 2] {
        [&mut self.input_weight, &mut self.recurrent_weight]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_forward_with_zero_weights() {
        let mut gate = Gate::new(3, 2, GateActivation::Sigmoid, 0.0, &mut StdRng::seed_from_u64(1));
        let x = Matrix::from_vec(1, 3, vec![1.0, 0.0, 0.0]).unwrap();
        let h = Matrix::zeros(1, 2);
        let value = gate.forward(&x, &h).unwrap();
        assert_eq!(value, &Matrix::filled(1, 2, 0.5));

        let mut tanh_gate = Gate::new(3, 2, GateActivation::Tanh, 0.0, &mut StdRng::seed_from_u64(1));
        assert_eq!(tanh_gate.forward(&x, &h).unwrap(), &Matrix::zeros(1, 2));
    }

    #[test]
    fn test_forward_rejects_wrong_input_width() {
        let mut gate = Gate::new(3, 2, GateActivation::Sigmoid, 0.1, &mut StdRng::seed_from_u64(1));
        let x = Matrix::zeros(1, 4);
        assert!(gate.forward(&x, &Matrix::zeros(1, 2)).is_err());
    }

    #[test]
    fn test_gradient_shapes_match_weights() {
        let mut gate = Gate::new(3, 2, GateActivation::Tanh, 0.1, &mut StdRng::seed_from_u64(3));
        let x = Matrix::from_vec(2, 3, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0]).unwrap();
        let h = Matrix::filled(2, 2, 0.5);
        let value = gate.forward(&x, &h).unwrap().clone();
        let delta = Matrix::ones(2, 2);

        gate.accumulate_gradients(&x, &h, &value, &delta).unwrap();

        assert_eq!(gate.input_weight.gradient.shape(), (3, 2));
        assert_eq!(gate.recurrent_weight.gradient.shape(), (2, 2));
        // Only the first two vocabulary rows saw input.
        assert_eq!(gate.input_weight.gradient.row(2).unwrap(), Matrix::zeros(1, 2));
    }

    #[test]
    fn test_from_parts_rejects_bad_bias() {
        let result = Gate::from_parts(
            GateActivation::Sigmoid,
            Weight::zeros(3, 2),
            Weight::zeros(2, 2),
            Matrix::zeros(2, 2),
        );
        assert!(matches!(result, Err(LstmError::InvalidShape { .. })));
    }
}
