//! Asset identity and encoding parameters.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Encoding family of a cached media variant.
///
/// The quality token carries the finer-grained parameters (bitrate for
/// lossy, sample-spec code for lossless), so two formats with the same
/// quality string never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingFormat {
    Lossy,
    Lossless,
}

impl EncodingFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lossy => "lossy",
            Self::Lossless => "lossless",
        }
    }
}

impl FromStr for EncodingFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lossy" => Ok(Self::Lossy),
            "lossless" => Ok(Self::Lossless),
            other => Err(Error::InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for EncodingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully qualified key for one cacheable media variant.
///
/// At most one live cache entry exists per key; a repeated put for the
/// same key overwrites the previous blob reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssetKey {
    /// Catalog identifier of the asset (opaque to this core).
    pub asset_id: String,
    /// Encoding family of the cached variant.
    pub format: EncodingFormat,
    /// Quality token, e.g. a bitrate ("192") or a sample-spec code.
    pub quality: String,
}

impl AssetKey {
    pub fn new(
        asset_id: impl Into<String>,
        format: EncodingFormat,
        quality: impl Into<String>,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            format,
            quality: quality.into(),
        }
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.asset_id, self.format, self.quality)
    }
}
