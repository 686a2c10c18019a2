/// Module for the LSTM + softmax sequence model.
pub mod rnn;
