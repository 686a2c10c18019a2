use rand::Rng;

use crate::error::{LstmError, Result};
use crate::layers::gate::{Gate, GateActivation};
use crate::layers::weight::Weight;
use crate::matrix::{ops, Matrix};

/// Values from one forward step, kept for the backward pass.
#[derive(Clone, Debug)]
pub struct LSTMCellCache {
    pub input: Matrix,
    pub prev_hidden: Matrix,
    pub prev_cell: Matrix,
    pub forget_gate: Matrix,
    pub input_gate: Matrix,
    pub candidate: Matrix,
    pub output_gate: Matrix,
    pub cell: Matrix,
    pub hidden: Matrix,
}

/// LSTM cell built from four gates and a persistent cell state.
///
/// Implements the standard LSTM equations on row-major batches:
/// - f_t = σ(x_t · W_f + h_t-1 · U_f + b_f)
/// - i_t = σ(x_t · W_i + h_t-1 · U_i + b_i)
/// - g_t = tanh(x_t · W_g + h_t-1 · U_g + b_g)
/// - c_t = f_t ⊙ c_t-1 + i_t ⊙ g_t
/// - o_t = σ(x_t · W_o + h_t-1 · U_o + b_o)
/// - h_t = o_t ⊙ tanh(c_t)
#[derive(Clone, Debug, PartialEq)]
pub struct LSTMCell {
    pub forget_gate: Gate,
    pub input_gate: Gate,
    pub candidate_gate: Gate,
    pub output_gate: Gate,
    pub cell_state: Matrix,
    pub input_size: usize,
    pub hidden_size: usize,
}

impl LSTMCell {
    /// Creates a cell with uniform `(-init_range, init_range)` weights and zero biases.
    pub fn new<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, init_range: f32, rng: &mut R) -> Self {
        let forget_gate = Gate::new(input_size, hidden_size, GateActivation::Sigmoid, init_range, rng);
        let input_gate = Gate::new(input_size, hidden_size, GateActivation::Sigmoid, init_range, rng);
        let candidate_gate = Gate::new(input_size, hidden_size, GateActivation::Tanh, init_range, rng);
        let output_gate = Gate::new(input_size, hidden_size, GateActivation::Sigmoid, init_range, rng);

        LSTMCell {
            forget_gate,
            input_gate,
            candidate_gate,
            output_gate,
            cell_state: Matrix::zeros(1, hidden_size),
            input_size,
            hidden_size,
        }
    }

    /// Creates a cell from existing gates (used for deserialization).
    pub fn from_gates(forget_gate: Gate, input_gate: Gate, candidate_gate: Gate, output_gate: Gate) -> Result<Self> {
        let input_size = forget_gate.input_size();
        let hidden_size = forget_gate.hidden_size();
        for gate in [&input_gate, &candidate_gate, &output_gate] {
            let actual = (gate.input_size(), gate.hidden_size());
            if actual != (input_size, hidden_size) {
                return Err(LstmError::InvalidShape { from: actual, to: (input_size, hidden_size) });
            }
        }
        Ok(LSTMCell {
            forget_gate,
            input_gate,
            candidate_gate,
            output_gate,
            cell_state: Matrix::zeros(1, hidden_size),
            input_size,
            hidden_size,
        })
    }

    /// Zeroes the cell state and cached gate values for a batch of `rows` sequences.
    pub fn reset_state(&mut self, rows: usize) {
        self.cell_state = Matrix::zeros(rows, self.hidden_size);
        for gate in [
            &mut self.forget_gate,
            &mut self.input_gate,
            &mut self.candidate_gate,
            &mut self.output_gate,
        ] {
            gate.value = Matrix::zeros(rows, self.hidden_size);
        }
    }

    pub fn forward(&mut self, input: &Matrix, hidden: &Matrix) -> Result<Matrix> {
        let (hy, _) = self.forward_with_cache(input, hidden)?;
        Ok(hy)
    }

    pub fn forward_with_cache(&mut self, input: &Matrix, hidden: &Matrix) -> Result<(Matrix, LSTMCellCache)> {
        let forget = self.forget_gate.forward(input, hidden)?.clone();
        let input_gate = self.input_gate.forward(input, hidden)?.clone();
        let candidate = self.candidate_gate.forward(input, hidden)?.clone();

        // Cell state update: f_t ⊙ c_t-1 + i_t ⊙ g_t
        let mut cell = ops::hadamard(&forget, &self.cell_state)?;
        cell.add(&ops::hadamard(&input_gate, &candidate)?)?;

        let output = self.output_gate.forward(input, hidden)?.clone();

        // Hidden state: o_t ⊙ tanh(c_t)
        let hy = ops::hadamard(&output, &ops::tanh(&cell))?;

        let prev_cell = std::mem::replace(&mut self.cell_state, cell.clone());

        let cache = LSTMCellCache {
            input: input.clone(),
            prev_hidden: hidden.clone(),
            prev_cell,
            forget_gate: forget,
            input_gate,
            candidate,
            output_gate: output,
            cell,
            hidden: hy.clone(),
        };

        Ok((hy, cache))
    }

    /// Accumulates gate gradients for one cached step given `d_hidden`,
    /// the loss gradient with respect to that step's hidden output.
    ///
    /// Only the local cell-state path is followed: `dC` does not receive the
    /// `f_{t+1}` term from the following step.
    pub fn backward(&mut self, d_hidden: &Matrix, cache: &LSTMCellCache) -> Result<()> {
        let tanh_cell = ops::tanh(&cache.cell);

        // ∂L/∂c_t = ∂L/∂h_t ⊙ o_t ⊙ tanh'(c_t)
        let mut d_cell = ops::hadamard(d_hidden, &cache.output_gate)?;
        d_cell.hadamard(&ops::dtanh(&cache.cell))?;

        let d_candidate = ops::hadamard(&d_cell, &cache.input_gate)?;
        let d_output = ops::hadamard(d_hidden, &tanh_cell)?;
        let d_input = ops::hadamard(&d_cell, &cache.candidate)?;
        let d_forget = ops::hadamard(&d_cell, &cache.prev_cell)?;

        self.forget_gate
            .accumulate_gradients(&cache.input, &cache.prev_hidden, &cache.forget_gate, &d_forget)?;
        self.input_gate
            .accumulate_gradients(&cache.input, &cache.prev_hidden, &cache.input_gate, &d_input)?;
        self.output_gate
            .accumulate_gradients(&cache.input, &cache.prev_hidden, &cache.output_gate, &d_output)?;
        self.candidate_gate
            .accumulate_gradients(&cache.input, &cache.prev_hidden, &cache.candidate, &d_candidate)
    }

    pub fn gates(&self) -> [&Gate; 4] {
        [&self.forget_gate, &self.input_gate, &self.candidate_gate, &self.output_gate]
    }

    /// Trainable weights in storage order: per gate (forget, input,
    /// candidate, output) the input then the recurrent weight.
    pub fn weights_mut(&mut self) -> Vec<&mut Weight> {
        let mut weights = Vec::with_capacity(8);
        for gate in [
            &mut self.forget_gate,
            &mut self.input_gate,
            &mut self.candidate_gate,
            &mut self.output_gate,
        ] {
            weights.extend(gate.weights_mut());
        }
        weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn one_hot(index: usize, size: usize) -> Matrix {
        let mut m = Matrix::zeros(1, size);
        m[(0, index)] = 1.0;
        m
    }

    #[test]
    fn test_lstm_cell_forward_shapes() {
        let mut cell = LSTMCell::new(3, 2, 0.1, &mut StdRng::seed_from_u64(42));
        let hy = cell.forward(&one_hot(0, 3), &Matrix::zeros(1, 2)).unwrap();
        assert_eq!(hy.shape(), (1, 2));
        assert_eq!(cell.cell_state.shape(), (1, 2));
    }

    #[test]
    fn test_zero_weights_follow_closed_form() {
        // All pre-activations are zero: f = i = o = 0.5, g = 0.
        let mut cell = LSTMCell::new(3, 2, 0.0, &mut StdRng::seed_from_u64(0));
        cell.cell_state = Matrix::filled(1, 2, 2.0);
        let hy = cell.forward(&one_hot(1, 3), &Matrix::zeros(1, 2)).unwrap();

        // c = 0.5 * 2 + 0.5 * 0 = 1, h = 0.5 * tanh(1)
        assert!(cell.cell_state.approx_eq(&Matrix::ones(1, 2), 1e-6));
        assert!(hy.approx_eq(&Matrix::filled(1, 2, 0.5 * 1.0_f32.tanh()), 1e-6));
    }

    #[test]
    fn test_cell_state_persists_across_calls() {
        let mut cell = LSTMCell::new(3, 2, 0.5, &mut StdRng::seed_from_u64(9));
        let h0 = Matrix::zeros(1, 2);
        let (h1, cache1) = cell.forward_with_cache(&one_hot(0, 3), &h0).unwrap();
        let (_, cache2) = cell.forward_with_cache(&one_hot(1, 3), &h1).unwrap();

        assert_eq!(cache1.prev_cell, Matrix::zeros(1, 2));
        assert_eq!(cache2.prev_cell, cache1.cell);
        assert_eq!(cache2.prev_hidden, h1);

        cell.reset_state(1);
        assert_eq!(cell.cell_state, Matrix::zeros(1, 2));
        assert_eq!(cell.output_gate.value, Matrix::zeros(1, 2));
    }

    #[test]
    fn test_backward_accumulates_into_every_gate() {
        let mut cell = LSTMCell::new(3, 2, 0.5, &mut StdRng::seed_from_u64(5));
        cell.cell_state = Matrix::filled(1, 2, 0.3);
        let (_, cache) = cell
            .forward_with_cache(&one_hot(2, 3), &Matrix::filled(1, 2, 0.2))
            .unwrap();

        cell.backward(&Matrix::ones(1, 2), &cache).unwrap();

        for gate in cell.gates() {
            assert!(gate.input_weight.gradient.iter().any(|g| *g != 0.0));
            assert!(gate.recurrent_weight.gradient.iter().any(|g| *g != 0.0));
        }
    }

    #[test]
    fn test_from_gates_rejects_mismatched_gate() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = LSTMCell::from_gates(
            Gate::new(3, 2, GateActivation::Sigmoid, 0.1, &mut rng),
            Gate::new(3, 2, GateActivation::Sigmoid, 0.1, &mut rng),
            Gate::new(4, 2, GateActivation::Tanh, 0.1, &mut rng),
            Gate::new(3, 2, GateActivation::Sigmoid, 0.1, &mut rng),
        );
        assert!(result.is_err());
    }
}
