//! # Rust LSTM Symbols
//!
//! A from-scratch LSTM sequence model over arbitrary symbol alphabets, with a
//! hand-derived backward pass and the Adam optimizer.
//!
//! ## Core Components
//!
//! - **Matrix**: dense `f32` matrices with in-place methods, copy-returning
//!   twins in [`matrix::ops`] and a textual slice syntax
//! - **Weight**: a trainable matrix carrying its gradient and Adam moments
//! - **LSTM Cell**: four gates and a persistent cell state
//! - **RNN**: the cell plus a softmax projection, with teacher-forced
//!   training, truncated BPTT and greedy or sampled generation
//! - **Vocabulary**: symbol ↔ id mapping and one-hot encoding
//! - **Persistence**: compact binary snapshots and JSON export
//!
//! ## Quick Start
//!
//! ```rust
//! use rust_lstm_symbols::{NetworkConfig, Vocabulary, RNN};
//!
//! let vocab = Vocabulary::from_text("abc");
//! let mut rnn = RNN::new(&NetworkConfig::new(vocab.size(), 8, 1).with_seed(1)).unwrap();
//!
//! let sequence = vocab.encode_text("abcabcabcabc").unwrap();
//! rnn.train(&sequence, 5).unwrap();
//!
//! let generated = rnn.generate(&vocab, &'a', 4).unwrap();
//! assert_eq!(generated.len(), 4);
//! ```

pub mod config;
pub mod error;
pub mod layers;
pub mod loss;
pub mod matrix;
pub mod models;
pub mod optimizers;
pub mod persistence;
pub mod text;
pub mod training;
pub mod utils;

// Re-export commonly used items
pub use config::{BpttMode, NetworkConfig, TrainingConfig};
pub use error::{LstmError, Result};
pub use layers::gate::{Gate, GateActivation};
pub use layers::lstm_cell::LSTMCell;
pub use layers::weight::Weight;
pub use loss::{CategoricalCrossEntropy, LossFunction};
pub use matrix::Matrix;
pub use models::rnn::{EpochReport, RNN};
pub use optimizers::AdamConfig;
pub use persistence::{ModelMetadata, ModelPersistence, PersistenceError, PersistentModel};
pub use text::Vocabulary;
pub use training::{StopReason, Trainer, TrainingMetrics};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_integration() {
        let vocab = Vocabulary::from_text("xyz");
        let mut rnn = RNN::new(&NetworkConfig::new(vocab.size(), 3, 1).with_seed(2)).unwrap();
        let input = vocab.encode(&'x').unwrap();

        let outputs = rnn.forward(&input, 3).unwrap();

        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[0].shape(), (1, 3));
        assert!(vocab.decode_sequence(&outputs).is_ok());
    }
}
