//! In-memory channel store for exercising the backup manager without a
//! network. Tracks every upload and delete so tests can verify cleanup
//! only ever touches sequence numbers the manager itself produced.

use async_trait::async_trait;
use bytes::Bytes;
use phono_channel::{
    ChannelError, ChannelResult, ChannelStore, MessageMeta, PinnedInfo, StoredBlob, UploadMeta,
};
use phono_core::{BlobRef, ContentTag, MessageSeq};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Clone)]
pub struct FakeMessage {
    pub blob_ref: String,
    pub filename: Option<String>,
    pub tag: Option<ContentTag>,
    pub data: Bytes,
}

#[derive(Default)]
struct State {
    next_seq: MessageSeq,
    seq_step: i64,
    messages: HashMap<MessageSeq, FakeMessage>,
    pinned: Option<MessageSeq>,
    uploaded_seqs: Vec<MessageSeq>,
    delete_calls: Vec<MessageSeq>,
    failing_deletes: HashSet<MessageSeq>,
    fail_uploads: bool,
    fail_fetches: bool,
}

#[allow(dead_code)] // Not every test binary uses every helper.
pub struct FakeChannelStore {
    state: Mutex<State>,
    upload_delay: Option<Duration>,
}

#[allow(dead_code)]
impl FakeChannelStore {
    pub fn new() -> Self {
        Self::starting_at(1, 1)
    }

    /// Control the sequence numbers minted by uploads.
    pub fn starting_at(start: MessageSeq, step: i64) -> Self {
        Self {
            state: Mutex::new(State {
                next_seq: start,
                seq_step: step,
                ..State::default()
            }),
            upload_delay: None,
        }
    }

    /// Make every upload take this long before completing.
    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = Some(delay);
        self
    }

    /// Insert a message directly, bypassing upload bookkeeping. Used to
    /// preload cache blobs and other content the manager does not own.
    pub fn seed_message(
        &self,
        seq: MessageSeq,
        blob_ref: &str,
        filename: Option<&str>,
        tag: Option<ContentTag>,
        data: &[u8],
    ) {
        let mut state = self.state.lock().unwrap();
        state.messages.insert(
            seq,
            FakeMessage {
                blob_ref: blob_ref.to_string(),
                filename: filename.map(str::to_string),
                tag,
                data: Bytes::copy_from_slice(data),
            },
        );
    }

    pub fn pin(&self, seq: MessageSeq) {
        self.state.lock().unwrap().pinned = Some(seq);
    }

    pub fn pinned_seq(&self) -> Option<MessageSeq> {
        self.state.lock().unwrap().pinned
    }

    /// Sequence numbers minted by `upload`, in order.
    pub fn uploaded_seqs(&self) -> Vec<MessageSeq> {
        self.state.lock().unwrap().uploaded_seqs.clone()
    }

    /// Every sequence number `delete` was called with, in order,
    /// including failed and already-absent attempts.
    pub fn delete_calls(&self) -> Vec<MessageSeq> {
        self.state.lock().unwrap().delete_calls.clone()
    }

    /// Sequence numbers still present in the channel, ascending.
    pub fn live_seqs(&self) -> Vec<MessageSeq> {
        let state = self.state.lock().unwrap();
        let mut seqs: Vec<_> = state.messages.keys().copied().collect();
        seqs.sort_unstable();
        seqs
    }

    pub fn fail_delete_of(&self, seq: MessageSeq) {
        self.state.lock().unwrap().failing_deletes.insert(seq);
    }

    pub fn allow_delete_of(&self, seq: MessageSeq) {
        self.state.lock().unwrap().failing_deletes.remove(&seq);
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.state.lock().unwrap().fail_uploads = fail;
    }

    pub fn set_fail_fetches(&self, fail: bool) {
        self.state.lock().unwrap().fail_fetches = fail;
    }
}

#[async_trait]
impl ChannelStore for FakeChannelStore {
    async fn upload(&self, data: Bytes, meta: &UploadMeta) -> ChannelResult<StoredBlob> {
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        if state.fail_uploads {
            return Err(ChannelError::Transient("injected upload failure".into()));
        }
        let seq = state.next_seq;
        state.next_seq += state.seq_step;
        let blob_ref = format!("blob-{seq}");
        state.messages.insert(
            seq,
            FakeMessage {
                blob_ref: blob_ref.clone(),
                filename: Some(meta.filename.clone()),
                tag: Some(meta.tag),
                data: data.clone(),
            },
        );
        state.uploaded_seqs.push(seq);
        Ok(StoredBlob {
            blob_ref: BlobRef::new(blob_ref),
            seq,
            size: data.len() as u64,
        })
    }

    async fn fetch(&self, blob_ref: &BlobRef) -> ChannelResult<Bytes> {
        let state = self.state.lock().unwrap();
        if state.fail_fetches {
            return Err(ChannelError::Transient("injected fetch failure".into()));
        }
        state
            .messages
            .values()
            .find(|m| m.blob_ref == blob_ref.as_str())
            .map(|m| m.data.clone())
            .ok_or_else(|| ChannelError::NotFound(blob_ref.to_string()))
    }

    async fn file_exists(&self, blob_ref: &BlobRef) -> ChannelResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state
            .messages
            .values()
            .any(|m| m.blob_ref == blob_ref.as_str()))
    }

    async fn get_pinned(&self) -> ChannelResult<Option<PinnedInfo>> {
        let state = self.state.lock().unwrap();
        let Some(seq) = state.pinned else {
            return Ok(None);
        };
        // A pin whose message is gone behaves as no pin at all.
        Ok(state.messages.get(&seq).map(|m| PinnedInfo {
            seq,
            blob_ref: Some(BlobRef::new(m.blob_ref.clone())),
            filename: m.filename.clone(),
            size: Some(m.data.len() as u64),
            tag: m.tag,
        }))
    }

    async fn set_pinned(&self, seq: MessageSeq) -> ChannelResult<()> {
        self.state.lock().unwrap().pinned = Some(seq);
        Ok(())
    }

    async fn delete(&self, seq: MessageSeq) -> ChannelResult<bool> {
        let mut state = self.state.lock().unwrap();
        state.delete_calls.push(seq);
        if state.failing_deletes.contains(&seq) {
            return Err(ChannelError::Transient("injected delete failure".into()));
        }
        Ok(state.messages.remove(&seq).is_some())
    }

    async fn probe_recent(
        &self,
        from_seq: MessageSeq,
        count: u32,
    ) -> ChannelResult<Vec<(MessageSeq, MessageMeta)>> {
        let state = self.state.lock().unwrap();
        let mut found = Vec::new();
        for offset in 0..i64::from(count) {
            let seq = from_seq - offset;
            if seq <= 0 {
                break;
            }
            if let Some(m) = state.messages.get(&seq) {
                found.push((
                    seq,
                    MessageMeta {
                        blob_ref: Some(BlobRef::new(m.blob_ref.clone())),
                        filename: m.filename.clone(),
                        size: Some(m.data.len() as u64),
                        tag: m.tag,
                    },
                ));
            }
        }
        Ok(found)
    }
}
