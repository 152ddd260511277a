//! HTTP implementation of the channel store over the chat bot API.
//!
//! Wire payloads are decoded once here into closed structs; nothing
//! above this layer sees raw JSON.

use crate::error::{ChannelError, ChannelResult};
use crate::traits::{ChannelStore, MessageMeta, PinnedInfo, StoredBlob, UploadMeta};
use async_trait::async_trait;
use bytes::Bytes;
use phono_core::config::ChannelConfig;
use phono_core::{BlobRef, ContentTag, MessageSeq};
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Fixed delay before the single internal retry of a transient failure.
const RETRY_DELAY: Duration = Duration::from_millis(500);

// ===== Wire payloads =====

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    message_id: MessageSeq,
    caption: Option<String>,
    document: Option<DocumentPayload>,
}

#[derive(Debug, Deserialize)]
struct DocumentPayload {
    file_id: String,
    file_name: Option<String>,
    file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct FilePayload {
    file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatPayload {
    pinned_message: Option<MessagePayload>,
}

impl MessagePayload {
    /// The declared content tag is the first caption token.
    fn tag(&self) -> Option<ContentTag> {
        self.caption
            .as_deref()
            .and_then(|c| c.split_whitespace().next())
            .and_then(ContentTag::parse)
    }

    fn into_meta(self) -> MessageMeta {
        let tag = self.tag();
        let (blob_ref, filename, size) = match self.document {
            Some(doc) => (
                Some(BlobRef::new(doc.file_id)),
                doc.file_name,
                doc.file_size,
            ),
            None => (None, None, None),
        };
        MessageMeta {
            blob_ref,
            filename,
            size,
            tag,
        }
    }

    fn into_pinned(self) -> PinnedInfo {
        let seq = self.message_id;
        let meta = self.into_meta();
        PinnedInfo {
            seq,
            blob_ref: meta.blob_ref,
            filename: meta.filename,
            size: meta.size,
            tag: meta.tag,
        }
    }
}

// ===== Error mapping =====

/// Map a transport-level failure. Timeouts, connect failures and
/// mid-body resets are retry-eligible; a malformed body is not.
fn map_transport(err: reqwest::Error) -> ChannelError {
    if err.is_decode() {
        ChannelError::Permanent(format!("invalid api response: {err}"))
    } else {
        ChannelError::Transient(err.to_string())
    }
}

/// Map an api-level rejection (HTTP status + `description` field).
fn map_rejection(status: StatusCode, description: &str) -> ChannelError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        ChannelError::Transient(format!("{status}: {description}"))
    } else if status == StatusCode::NOT_FOUND
        || description.to_ascii_lowercase().contains("not found")
    {
        ChannelError::NotFound(description.to_string())
    } else {
        ChannelError::Permanent(format!("{status}: {description}"))
    }
}

/// Run an operation, retrying once after a short fixed delay if the
/// first attempt failed transiently. Anything beyond this single retry
/// is caller policy.
async fn with_retry<T, F, Fut>(op: F) -> ChannelResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = ChannelResult<T>>,
{
    match op().await {
        Err(ChannelError::Transient(reason)) => {
            tracing::debug!(%reason, "transient channel error, retrying once");
            tokio::time::sleep(RETRY_DELAY).await;
            op().await
        }
        other => other,
    }
}

// ===== Client =====

/// Reqwest-backed channel store client. Stateless; safely shared.
pub struct HttpChannelStore {
    http: reqwest::Client,
    base_url: String,
    token: String,
    channel_id: String,
}

impl HttpChannelStore {
    /// Create a new client from configuration.
    pub fn new(config: &ChannelConfig) -> ChannelResult<Self> {
        config.validate().map_err(ChannelError::Config)?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ChannelError::Config(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            channel_id: config.channel_id.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    fn download_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base_url, self.token, file_path)
    }

    /// Send a request and unwrap the `{ok, result, description}` envelope.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> ChannelResult<T> {
        let response = request.send().await.map_err(map_transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport)?;

        let envelope: ApiEnvelope<T> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            // A gateway 5xx often carries a non-JSON body; that is still
            // a retry-eligible failure, not a protocol mismatch.
            Err(_) if status.is_server_error() => {
                return Err(ChannelError::Transient(format!(
                    "{status}: unparseable server error body"
                )));
            }
            Err(e) => {
                return Err(ChannelError::Permanent(format!(
                    "invalid api response: {e}"
                )));
            }
        };

        if envelope.ok {
            envelope
                .result
                .ok_or_else(|| ChannelError::Permanent("api response missing result".to_string()))
        } else {
            let description = envelope.description.unwrap_or_default();
            Err(map_rejection(status, &description))
        }
    }

    fn upload_form(&self, data: &Bytes, meta: &UploadMeta) -> Form {
        let caption = match &meta.caption {
            Some(caption) => format!("{} {}", meta.tag, caption),
            None => meta.tag.as_str().to_string(),
        };
        Form::new()
            .text("chat_id", self.channel_id.clone())
            .text("caption", caption)
            .text("disable_notification", "true")
            .part(
                "document",
                Part::stream(data.clone()).file_name(meta.filename.clone()),
            )
    }

    async fn get_message(&self, seq: MessageSeq) -> ChannelResult<MessagePayload> {
        let seq_param = seq.to_string();
        self.execute::<MessagePayload>(self.http.get(self.method_url("getMessage")).query(&[
            ("chat_id", self.channel_id.as_str()),
            ("message_id", seq_param.as_str()),
        ]))
        .await
    }
}

#[async_trait]
impl ChannelStore for HttpChannelStore {
    async fn upload(&self, data: Bytes, meta: &UploadMeta) -> ChannelResult<StoredBlob> {
        let size_hint = data.len() as u64;
        let message = with_retry(|| async {
            self.execute::<MessagePayload>(
                self.http
                    .post(self.method_url("sendDocument"))
                    .multipart(self.upload_form(&data, meta)),
            )
            .await
        })
        .await?;

        let seq = message.message_id;
        let document = message.document.ok_or_else(|| {
            ChannelError::Permanent("upload response carries no document".to_string())
        })?;
        tracing::debug!(seq, filename = %meta.filename, size = size_hint, "blob uploaded");

        Ok(StoredBlob {
            blob_ref: BlobRef::new(document.file_id),
            seq,
            size: document.file_size.unwrap_or(size_hint),
        })
    }

    async fn fetch(&self, blob_ref: &BlobRef) -> ChannelResult<Bytes> {
        with_retry(|| async {
            let file = self
                .execute::<FilePayload>(
                    self.http
                        .get(self.method_url("getFile"))
                        .query(&[("file_id", blob_ref.as_str())]),
                )
                .await?;

            let file_path = file.file_path.ok_or_else(|| {
                ChannelError::NotFound(format!("no download path for {blob_ref}"))
            })?;

            let response = self
                .http
                .get(self.download_url(&file_path))
                .send()
                .await
                .map_err(map_transport)?;
            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(ChannelError::NotFound(blob_ref.to_string()));
            }
            if !status.is_success() {
                return Err(map_rejection(status, "blob download failed"));
            }
            response.bytes().await.map_err(map_transport)
        })
        .await
    }

    async fn file_exists(&self, blob_ref: &BlobRef) -> ChannelResult<bool> {
        let probe = with_retry(|| async {
            self.execute::<FilePayload>(
                self.http
                    .get(self.method_url("getFile"))
                    .query(&[("file_id", blob_ref.as_str())]),
            )
            .await
        })
        .await;

        match probe {
            Ok(_) => Ok(true),
            Err(ChannelError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_pinned(&self) -> ChannelResult<Option<PinnedInfo>> {
        let chat = with_retry(|| async {
            self.execute::<ChatPayload>(
                self.http
                    .get(self.method_url("getChat"))
                    .query(&[("chat_id", self.channel_id.as_str())]),
            )
            .await
        })
        .await?;

        Ok(chat.pinned_message.map(MessagePayload::into_pinned))
    }

    async fn set_pinned(&self, seq: MessageSeq) -> ChannelResult<()> {
        let seq_param = seq.to_string();
        with_retry(|| async {
            self.execute::<bool>(self.http.post(self.method_url("pinChatMessage")).form(&[
                ("chat_id", self.channel_id.as_str()),
                ("message_id", seq_param.as_str()),
                ("disable_notification", "true"),
            ]))
            .await
        })
        .await?;
        Ok(())
    }

    async fn delete(&self, seq: MessageSeq) -> ChannelResult<bool> {
        let seq_param = seq.to_string();
        let outcome = with_retry(|| async {
            self.execute::<bool>(self.http.post(self.method_url("deleteMessage")).form(&[
                ("chat_id", self.channel_id.as_str()),
                ("message_id", seq_param.as_str()),
            ]))
            .await
        })
        .await;

        match outcome {
            Ok(confirmed) => Ok(confirmed),
            // Already gone: a normal outcome, not an error.
            Err(ChannelError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn probe_recent(
        &self,
        from_seq: MessageSeq,
        count: u32,
    ) -> ChannelResult<Vec<(MessageSeq, MessageMeta)>> {
        let mut found = Vec::new();
        for offset in 0..i64::from(count) {
            let seq = from_seq - offset;
            if seq <= 0 {
                break;
            }
            match self.get_message(seq).await {
                Ok(message) => found.push((seq, message.into_meta())),
                // Absent or unreadable: treated as "not present", never
                // aborting the scan.
                Err(e) => {
                    tracing::trace!(seq, error = %e, "probe miss");
                }
            }
        }
        Ok(found)
    }
}
