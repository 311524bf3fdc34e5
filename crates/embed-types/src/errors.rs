//! Validation errors raised on malformed user input.
//!
//! None of these mutate state: the command that produced one is rejected
//! as a whole and the caller reports the message back to the requester.

use thiserror::Error;

/// Malformed user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid color '{0}': use a palette name or a hex value like 0xFF0000")]
    InvalidColor(String),

    #[error("A document can hold at most {limit} fields")]
    FieldLimitExceeded { limit: usize },

    #[error("{part} is too long ({actual} > {max} characters)")]
    TooLong {
        part: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("Document name must not be empty")]
    EmptyName,
}
