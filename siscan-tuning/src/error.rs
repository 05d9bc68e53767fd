//! Error types for the tuning parameter codec.

use thiserror::Error;

/// Errors raised while parsing a textual tuning descriptor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The string has no tokens (or only a comment).
    #[error("Error parsing tuning string '{input}': empty")]
    Empty { input: String },

    /// The leading system token is not a known delivery system.
    #[error("Error parsing tuning string '{input}': invalid type '{token}'")]
    InvalidType { token: String, input: String },

    /// Fewer tokens than the delivery system requires.
    #[error("Error parsing tuning string '{input}': too few parameters (need {needed}, got {got})")]
    TooFewParameters {
        needed: usize,
        got: usize,
        input: String,
    },

    /// A token could not be interpreted for the field it occupies.
    #[error("Error parsing tuning string '{input}': invalid {field} '{token}'")]
    InvalidToken {
        field: &'static str,
        token: String,
        input: String,
    },
}

impl ParseError {
    /// The token that caused the failure, if any.
    pub fn token(&self) -> Option<&str> {
        match self {
            ParseError::InvalidType { token, .. } | ParseError::InvalidToken { token, .. } => {
                Some(token)
            }
            _ => None,
        }
    }

    /// The full tuning string that failed to parse.
    pub fn input(&self) -> &str {
        match self {
            ParseError::Empty { input }
            | ParseError::InvalidType { input, .. }
            | ParseError::TooFewParameters { input, .. }
            | ParseError::InvalidToken { input, .. } => input,
        }
    }
}
