//! Remote blob cache and snapshot backup subsystem.
//!
//! Two logical stores share one flat, weakly-queryable channel:
//! - [`AssetCache`] keeps per-asset encoded media addressable by
//!   (asset id, format, quality) with lazy TTL expiry
//! - [`BackupManager`] keeps rolling snapshots of the database file,
//!   restores on startup, maintains the pinned pointer, and prunes old
//!   snapshots using only its own snapshot log
//!
//! The two never cross-reference: cleanup of one cannot touch blobs
//! owned by the other.

pub mod cache;
pub mod error;
pub mod manager;
pub mod scheduler;

pub use cache::AssetCache;
pub use error::{BackupError, BackupResult};
pub use manager::{BackupManager, RestoreOutcome, SnapshotOutcome};
