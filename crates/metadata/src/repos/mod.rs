//! Repository traits, one per concern.

pub mod asset_cache;
pub mod snapshot_log;

pub use asset_cache::AssetCacheRepo;
pub use snapshot_log::SnapshotLogRepo;
