//! Snapshot log repository trait.

use crate::error::MetadataResult;
use crate::models::SnapshotRow;
use async_trait::async_trait;
use phono_core::MessageSeq;

/// Repository for the `snapshot_log` table.
///
/// The log exists so retention cleanup stays correct across process
/// restarts without content-sniffing the channel: only sequence numbers
/// recorded here are ever eligible for deletion.
#[async_trait]
pub trait SnapshotLogRepo: Send + Sync {
    /// Record a freshly uploaded snapshot.
    async fn append_snapshot(&self, record: &SnapshotRow) -> MetadataResult<()>;

    /// All known snapshots, oldest first.
    async fn list_snapshots_by_age(&self) -> MetadataResult<Vec<SnapshotRow>>;

    /// Forget a snapshot after its remote message is confirmed gone.
    /// Returns true iff a row was deleted.
    async fn remove_snapshot(&self, sequence_number: MessageSeq) -> MetadataResult<bool>;
}
