//! Error types for checked container operations.
//!
//! Precondition violations (bad index, empty structure, stale block) are
//! reported through [`ContainerError`] by the `try_*` family of methods.
//! Data-level outcomes such as "already present" are not errors in this
//! sense and are returned as plain `Option`/`Result` values by each module.

use thiserror::Error;

/// Failure of a checked container operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// Index past the number of valid elements.
    #[error("index {index} out of bounds for length {len}")]
    OutOfBounds {
        /// The offending index
        index: usize,
        /// Number of valid elements at the time of the call
        len: usize,
    },

    /// Pop or remove on a structure with no elements.
    #[error("operation requires a non-empty container")]
    Empty,

    /// A mempool block key that was freed or truncated away.
    #[error("block was freed or its pool was truncated")]
    StaleBlock,

    /// A recycle-array position that is already on the free stack.
    #[error("position {position} is already free")]
    AlreadyFree {
        /// The position passed to remove
        position: usize,
    },

    /// Configuration values that cannot drive a growth policy.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong with the configuration
        message: String,
    },
}

impl ContainerError {
    /// Create an out of bounds error
    pub fn out_of_bounds(index: usize, len: usize) -> Self {
        Self::OutOfBounds { index, len }
    }

    /// Create an invalid configuration error
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Result alias used by checked operations.
pub type Result<T, E = ContainerError> = core::result::Result<T, E>;
