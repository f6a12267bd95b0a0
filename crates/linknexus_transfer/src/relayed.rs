use std::sync::Arc;

use linknexus_bridge::{TransportReply, UploadForm, UploadTransport};
use linknexus_contract::error::megabytes;
use linknexus_contract::{SentMessage, TransferError, TransferRequest};
use serde_json::Value;
use tracing::{info, warn};

use crate::direct::{accept_platform_reply, OFFICIAL_API_LIMIT_BYTES, SELF_HOSTED_LIMIT_BYTES};
use crate::guess_mime;
use crate::progress::ProgressReporter;

pub const RELAY_UPLOAD_PATH: &str = "/api/upload";

pub const DEFAULT_RELAY_LIMIT_BYTES: u64 = 25 * 1024 * 1024;

pub const RELAY_MILESTONES: [f64; 3] = [10.0, 90.0, 100.0];

#[derive(Clone)]
pub struct RelayedExecutor {
    transport: Arc<dyn UploadTransport>,
    endpoint: String,
    limit_bytes: u64,
}

impl RelayedExecutor {
    pub fn new(transport: Arc<dyn UploadTransport>, relay_base: &str) -> Self {
        Self {
            transport,
            endpoint: format!("{}{RELAY_UPLOAD_PATH}", relay_base.trim_end_matches('/')),
            limit_bytes: DEFAULT_RELAY_LIMIT_BYTES,
        }
    }

    pub fn with_limit(mut self, limit_bytes: u64) -> Self {
        self.limit_bytes = limit_bytes.min(OFFICIAL_API_LIMIT_BYTES - 1);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn limit_bytes(&self) -> u64 {
        self.limit_bytes
    }

    pub async fn execute(
        &self,
        request: &TransferRequest,
        type_tag: &str,
        progress: &ProgressReporter,
    ) -> Result<SentMessage, TransferError> {
        if request.file_size_bytes > self.limit_bytes {
            return Err(self.oversize_error(request.file_size_bytes));
        }

        let mut form = UploadForm::new("file", request.file_name.clone(), request.file_bytes.clone())
            .text("caption", request.caption.clone())
            .text("type", type_tag);
        if let Some(mime_type) = guess_mime(&request.file_name) {
            form = form.mime_type(mime_type);
        }

        info!(
            endpoint = %self.endpoint,
            type_tag,
            size = request.file_size_bytes,
            "starting relayed upload"
        );
        progress.report(RELAY_MILESTONES[0]);

        let reply = self
            .transport
            .post_multipart(&self.endpoint, form, None)
            .await
            .map_err(|err| {
                TransferError::Network(format!(
                    "could not reach the relay at {}: {err}; check that it is running or configure a bot token and chat id to upload directly",
                    self.endpoint
                ))
            })?;
        progress.report(RELAY_MILESTONES[1]);

        let message = self.interpret(&reply, request.file_size_bytes)?;
        progress.report(RELAY_MILESTONES[2]);
        info!(message_id = message.message_id, "relayed upload accepted");
        Ok(message)
    }

    fn interpret(&self, reply: &TransportReply, size: u64) -> Result<SentMessage, TransferError> {
        if reply.is_success() || reply.status == 413 {
            return accept_platform_reply(reply, || self.oversize_error(size));
        }

        match serde_json::from_str::<Value>(&reply.body) {
            Ok(Value::Object(body)) => {
                let detail = ["error", "description", "message"]
                    .iter()
                    .find_map(|key| body.get(*key).and_then(Value::as_str))
                    .map(str::to_string)
                    .unwrap_or_else(|| Value::Object(body.clone()).to_string());
                warn!(status = reply.status, detail = %detail, "relay reported a failure");
                let remediation = match body.get("kind").and_then(Value::as_str) {
                    Some("network") => {
                        "the relay could not reach the Bot API; check the relay host's network access or configure a bot token and chat id to upload directly"
                    }
                    _ => "check the relay's upstream bot token and chat id",
                };
                Err(TransferError::BackendConfiguration(format!(
                    "relay answered HTTP {}: {detail}; {remediation}",
                    reply.status
                )))
            }
            _ => {
                warn!(status = reply.status, "relay returned an uninterpretable failure");
                Err(TransferError::BackendCrash(format!(
                    "relay answered HTTP {} with a failure this client cannot interpret (it may have run out of resources or timed out upstream); configure a bot token and chat id to upload directly",
                    reply.status
                )))
            }
        }
    }

    fn oversize_error(&self, size: u64) -> TransferError {
        TransferError::oversize(
            self.limit_bytes,
            format!(
                "file is {} MB but the relay accepts at most {} MB; configure a bot token and chat id to upload directly (up to {} MB, or {} MB through a self-hosted Bot API server)",
                megabytes(size),
                megabytes(self.limit_bytes),
                megabytes(OFFICIAL_API_LIMIT_BYTES),
                megabytes(SELF_HOSTED_LIMIT_BYTES)
            ),
        )
    }
}
