//! Error types for node evaluation.
//!
//! There is a single error type, [`CalculationError`]. A node raises it from
//! `calculate` when its inputs are incomplete or invalid, and it propagates
//! unmodified through `Node::refresh` and `Network::evaluate`. There is no
//! retry and no rollback: the caller decides whether to evaluate again.

use thiserror::Error;

/// Result type for node calculations.
pub type CalculationResult<T> = Result<T, CalculationError>;

/// Errors raised while calculating a node.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalculationError {
    /// The inputs are present but semantically invalid.
    #[error("invalid inputs: {reason}")]
    Invalid { reason: String },

    /// A required input value was absent.
    #[error("missing input at position {index}")]
    MissingInput { index: usize },

    /// An input value did not hold the expected type.
    #[error("input at position {index} is not a {expected}")]
    InputType {
        index: usize,
        expected: &'static str,
    },

    /// A calculated value could not be stored in its output slot.
    #[error("output '{output}' expects a {expected}")]
    OutputType {
        output: String,
        expected: &'static str,
    },

    /// `calculate` returned the wrong number of values.
    #[error("expected {expected} output values, calculate returned {actual}")]
    OutputCount { expected: usize, actual: usize },
}

impl CalculationError {
    /// Shorthand for [`CalculationError::Invalid`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}
