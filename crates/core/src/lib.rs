//! Core domain types and shared logic for the phono storage core.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Asset keys (asset id + encoding format + quality)
//! - Blob references and channel sequence numbers
//! - Content tags distinguishing snapshot blobs from cached media
//! - Configuration for the channel client, database, backup and cache

pub mod asset;
pub mod blob;
pub mod config;
pub mod error;

pub use asset::{AssetKey, EncodingFormat};
pub use blob::{BlobRef, ContentTag, MessageSeq};
pub use error::{Error, Result};

/// Default cache TTL in days before an entry is treated as a miss.
pub const DEFAULT_CACHE_TTL_DAYS: u64 = 7;

/// Default number of most recent snapshots kept in the channel.
pub const DEFAULT_RETAIN_COUNT: usize = 2;

/// Default minimum database file size considered a plausibly non-empty
/// schema; smaller local files trigger a restore attempt.
pub const DEFAULT_MIN_RESTORE_BYTES: u64 = 32 * 1024;
