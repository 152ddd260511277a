//! Backup subsystem error types.

use phono_channel::ChannelError;
use phono_metadata::MetadataError;
use thiserror::Error;

/// Backup/restore operation errors.
///
/// These are reported, not fatal: every caller in the subsystem treats
/// a failed step as "log and retry on the next cycle". The only place a
/// failure stops the process is opening the database itself, which
/// happens outside this crate.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for backup operations.
pub type BackupResult<T> = std::result::Result<T, BackupError>;
