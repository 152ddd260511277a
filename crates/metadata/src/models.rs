//! Database models mapping to the metadata schema.

use phono_core::BlobRef;
use sqlx::FromRow;
use time::OffsetDateTime;

/// Asset cache entry: one row per fully qualified asset key.
///
/// A write to an existing key overwrites `blob_ref` and `created_at`;
/// the composite primary key guarantees no duplicate rows per key.
#[derive(Debug, Clone, FromRow)]
pub struct AssetCacheRow {
    pub asset_id: String,
    pub format: String,
    pub quality: String,
    pub blob_ref: String,
    pub created_at: OffsetDateTime,
}

impl AssetCacheRow {
    /// The stored reference as an owned handle.
    pub fn blob_ref(&self) -> BlobRef {
        BlobRef::new(self.blob_ref.clone())
    }
}

/// Snapshot log entry: one row per database snapshot known to live in
/// the channel.
///
/// Append-only from the backup manager; a row is removed only after the
/// corresponding remote message was confirmed gone. Because this table
/// lives inside the database it describes, a restored database brings
/// its own cleanup history with it.
#[derive(Debug, Clone, FromRow)]
pub struct SnapshotRow {
    pub sequence_number: i64,
    pub blob_ref: String,
    pub created_at: OffsetDateTime,
}

impl SnapshotRow {
    pub fn blob_ref(&self) -> BlobRef {
        BlobRef::new(self.blob_ref.clone())
    }
}
