//! Error type returned by retry sessions
//!
//! The operation's own error is carried as-is: no attempt history, no
//! re-formatting. Earlier failures are only visible through the `Failure`
//! event.

use std::error::Error;
use std::fmt;

/// Errors returned by [`RetrySession::execute`](super::RetrySession::execute)
/// and the one-shot [`retry`](super::retry) functions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// The attempt budget was not a positive integer
    ///
    /// Returned before the operation is ever invoked.
    InvalidArgument {
        /// The rejected attempt budget
        max_attempts: u32,
    },

    /// Every attempt failed; this is the final attempt's error, unchanged
    Operation(E),
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::InvalidArgument { max_attempts } => {
                write!(
                    f,
                    "invalid argument: max attempts must be at least 1, got {}",
                    max_attempts
                )
            }
            RetryError::Operation(source) => write!(f, "{}", source),
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetryError::Operation(source) => Some(source),
            RetryError::InvalidArgument { .. } => None,
        }
    }
}

impl<E> RetryError<E> {
    /// Create an invalid argument error
    pub fn invalid_argument(max_attempts: u32) -> Self {
        RetryError::InvalidArgument { max_attempts }
    }

    /// Check if the attempt budget was rejected
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, RetryError::InvalidArgument { .. })
    }

    /// Check if this carries the operation's error
    pub fn is_operation(&self) -> bool {
        matches!(self, RetryError::Operation(_))
    }

    /// Get a reference to the operation's error
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            RetryError::Operation(source) => Some(source),
            RetryError::InvalidArgument { .. } => None,
        }
    }

    /// Get the operation's error, consuming this error
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryError::Operation(source) => Some(source),
            RetryError::InvalidArgument { .. } => None,
        }
    }

    /// Map the operation's error type using a closure
    pub fn map_err<F, E2>(self, f: F) -> RetryError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            RetryError::InvalidArgument { max_attempts } => {
                RetryError::InvalidArgument { max_attempts }
            }
            RetryError::Operation(source) => RetryError::Operation(f(source)),
        }
    }
}
