//! Channel store trait definition.

use crate::error::ChannelResult;
use async_trait::async_trait;
use bytes::Bytes;
use phono_core::{BlobRef, ContentTag, MessageSeq};

/// Metadata declared on an upload.
///
/// The content tag travels with the message so restore and cleanup can
/// classify blobs later without fetching their bodies.
#[derive(Clone, Debug)]
pub struct UploadMeta {
    /// Filename declared to the store.
    pub filename: String,
    /// Declared content kind.
    pub tag: ContentTag,
    /// Optional human-readable caption appended after the tag.
    pub caption: Option<String>,
}

impl UploadMeta {
    pub fn new(filename: impl Into<String>, tag: ContentTag) -> Self {
        Self {
            filename: filename.into(),
            tag,
            caption: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}

/// Result of a successful upload.
#[derive(Clone, Debug)]
pub struct StoredBlob {
    /// Opaque handle for fetching the blob bytes.
    pub blob_ref: BlobRef,
    /// Message position; the handle for pinning and deletion.
    pub seq: MessageSeq,
    /// Size in bytes as reported by the store.
    pub size: u64,
}

/// Decoded metadata of the channel's single pinned message.
///
/// A pin can legitimately be anything: a database snapshot, a cached
/// asset, or an unrelated item pinned by hand. Callers must type-check
/// before treating it as a snapshot.
#[derive(Clone, Debug)]
pub struct PinnedInfo {
    pub seq: MessageSeq,
    /// Reference to the attached blob, if the pinned message carries one.
    pub blob_ref: Option<BlobRef>,
    pub filename: Option<String>,
    pub size: Option<u64>,
    pub tag: Option<ContentTag>,
}

impl PinnedInfo {
    /// The blob reference, if this pin is identifiable as a database
    /// snapshot: either tagged `db-snapshot`, or untagged with a `.db`
    /// filename (pins written before tags existed). A pin tagged as
    /// anything else is never accepted, whatever its filename.
    pub fn snapshot_ref(&self) -> Option<&BlobRef> {
        let is_snapshot = match self.tag {
            Some(ContentTag::DbSnapshot) => true,
            Some(_) => false,
            None => self
                .filename
                .as_deref()
                .is_some_and(|name| name.ends_with(".db")),
        };
        if is_snapshot { self.blob_ref.as_ref() } else { None }
    }
}

/// Decoded metadata of an arbitrary probed message.
#[derive(Clone, Debug)]
pub struct MessageMeta {
    pub blob_ref: Option<BlobRef>,
    pub filename: Option<String>,
    pub size: Option<u64>,
    pub tag: Option<ContentTag>,
}

/// Message-oriented blob store abstraction over one chat channel.
///
/// Implementations are stateless request layers: network calls only, no
/// business policy, at most one internal retry with a short fixed delay
/// on transient failures. Higher-level retry and backoff belong to
/// callers. All methods are independently retriable.
#[async_trait]
pub trait ChannelStore: Send + Sync + 'static {
    /// Upload a blob as a new message.
    async fn upload(&self, data: Bytes, meta: &UploadMeta) -> ChannelResult<StoredBlob>;

    /// Fetch a blob's bytes by reference. `NotFound` when the reference
    /// no longer resolves (deleted or never existed).
    async fn fetch(&self, blob_ref: &BlobRef) -> ChannelResult<Bytes>;

    /// Whether a reference still resolves, without fetching the body.
    async fn file_exists(&self, blob_ref: &BlobRef) -> ChannelResult<bool>;

    /// Get the channel's pinned message, decoded. `None` when nothing
    /// is pinned.
    async fn get_pinned(&self) -> ChannelResult<Option<PinnedInfo>>;

    /// Pin a message, replacing any previous pin.
    async fn set_pinned(&self, seq: MessageSeq) -> ChannelResult<()>;

    /// Delete a message. Returns true iff the store confirmed the
    /// deletion; false (not an error) when it was already absent.
    async fn delete(&self, seq: MessageSeq) -> ChannelResult<bool>;

    /// Best-effort backward enumeration: probe up to `count` sequence
    /// numbers walking down from `from_seq`. The store has no list API,
    /// so this is the only discovery primitive. Individual probe
    /// failures are swallowed and treated as "not present"; they never
    /// abort the scan.
    async fn probe_recent(
        &self,
        from_seq: MessageSeq,
        count: u32,
    ) -> ChannelResult<Vec<(MessageSeq, MessageMeta)>>;
}
