//! Blob references, channel sequence numbers and content tags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message-position identifier assigned by the channel store.
///
/// Sequence numbers are the only handle for pinning and deleting; blob
/// bytes are addressed separately through [`BlobRef`].
pub type MessageSeq = i64;

/// Opaque handle returned by the channel store on upload.
///
/// The only way to later fetch the uploaded bytes. Never interpreted,
/// only stored and replayed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(String);

impl BlobRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for BlobRef {
    fn from(reference: String) -> Self {
        Self(reference)
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared content kind of an uploaded blob.
///
/// Carried in upload metadata so that restore and cleanup can tell a
/// database snapshot from cached media without fetching the body or
/// guessing from size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentTag {
    /// A full copy of the local database file.
    DbSnapshot,
    /// An encoded media blob owned by the asset cache.
    AssetCache,
}

impl ContentTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DbSnapshot => "db-snapshot",
            Self::AssetCache => "asset-cache",
        }
    }

    /// Decode a tag from declared metadata. Unknown tags decode to
    /// `None` rather than an error: a pin may legitimately carry
    /// unrelated content.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "db-snapshot" => Some(Self::DbSnapshot),
            "asset-cache" => Some(Self::AssetCache),
            _ => None,
        }
    }
}

impl fmt::Display for ContentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
