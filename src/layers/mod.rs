/// Trainable matrix with Adam state.
pub mod weight;

/// A single LSTM gate.
pub mod gate;

/// Four-gate LSTM cell with persistent cell state.
pub mod lstm_cell;
