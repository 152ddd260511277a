//! Channel store error types.

use thiserror::Error;

/// Channel store operation errors.
///
/// `NotFound` is a normal, expected outcome (a reference that no longer
/// resolves), not a crash condition. `Transient` is retry-eligible;
/// `Permanent` is not and surfaces to the caller.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("transient store error: {0}")]
    Transient(String),

    #[error("permanent store error: {0}")]
    Permanent(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ChannelError {
    /// Whether a caller-level retry could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Result type for channel store operations.
pub type ChannelResult<T> = std::result::Result<T, ChannelError>;
