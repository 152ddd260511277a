//! Channel store client for the phono storage core.
//!
//! The external store is a chat channel that only speaks in messages:
//! upload a blob as a message, pin one message per channel, delete a
//! message by sequence number. There is no list or query API. This
//! crate provides:
//! - The [`ChannelStore`] trait, the seam between the storage core and
//!   the network
//! - [`HttpChannelStore`], the reqwest implementation over the chat
//!   HTTP API
//! - The transient/permanent/not-found error taxonomy callers build
//!   their retry policy on

pub mod error;
pub mod http;
pub mod traits;

pub use error::{ChannelError, ChannelResult};
pub use http::HttpChannelStore;
pub use traits::{ChannelStore, MessageMeta, PinnedInfo, StoredBlob, UploadMeta};

use phono_core::config::ChannelConfig;
use std::sync::Arc;

/// Create a channel store from configuration.
pub fn from_config(config: &ChannelConfig) -> ChannelResult<Arc<dyn ChannelStore>> {
    let store = HttpChannelStore::new(config)?;
    Ok(Arc::new(store))
}
