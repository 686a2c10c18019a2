//! Error kinds raised by the numeric core.

/// Errors produced by matrix operations, the vocabulary and the trainer.
///
/// Every variant is raised synchronously at the point of failure. A failed
/// operation may leave the receiving matrix or weight half-written; callers
/// should discard it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LstmError {
    #[error("shape mismatch in {operation}: {left:?} vs {right:?}")]
    ShapeMismatch {
        operation: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("cannot reshape {from:?} into {to:?}")]
    InvalidShape {
        from: (usize, usize),
        to: (usize, usize),
    },

    #[error("invalid slice '{expression}': {reason}")]
    InvalidSlice { expression: String, reason: String },

    #[error("invalid one-hot vector: {0}")]
    InvalidOneHot(String),

    #[error("symbol not in vocabulary: {0}")]
    SymbolNotFound(String),

    #[error("operation not implemented: {0}")]
    Unimplemented(&'static str),

    #[error("insufficient training data: {0}")]
    InsufficientData(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LstmError>;

impl LstmError {
    pub(crate) fn shape_mismatch(
        operation: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    ) -> Self {
        LstmError::ShapeMismatch { operation, left, right }
    }
}
