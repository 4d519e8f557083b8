use thiserror::Error;

/// Errors produced by value conversions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("type mismatch: expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("integer {0} out of range for target type")]
    OutOfRange(i64),

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}
