use std::sync::Arc;

use linknexus_bridge::{TransportReply, UploadForm, UploadTransport};
use linknexus_contract::error::megabytes;
use linknexus_contract::{Credentials, Operation, PlatformReply, SentMessage, TransferError, TransferRequest};
use tracing::{info, warn};

use crate::guess_mime;
use crate::progress::ProgressReporter;

pub const OFFICIAL_API_LIMIT_BYTES: u64 = 50 * 1024 * 1024;
pub const SELF_HOSTED_LIMIT_BYTES: u64 = 2000 * 1024 * 1024;

const ENTITY_TOO_LARGE: u16 = 413;

#[derive(Clone)]
pub struct DirectExecutor {
    transport: Arc<dyn UploadTransport>,
}

impl DirectExecutor {
    pub fn new(transport: Arc<dyn UploadTransport>) -> Self {
        Self { transport }
    }

    pub async fn execute(
        &self,
        request: &TransferRequest,
        operation: Operation,
        credentials: &Credentials,
        progress: &ProgressReporter,
    ) -> Result<SentMessage, TransferError> {
        let reply = self.send(request, operation, credentials, progress).await?;
        let message = accept_platform_reply(&reply, oversize_error)?;
        progress.report(100.0);
        info!(message_id = message.message_id, "direct upload accepted");
        Ok(message)
    }

    /// Performs the upload and hands back the platform's raw reply without
    /// interpreting it. The relay uses this to pass replies through verbatim.
    pub async fn send(
        &self,
        request: &TransferRequest,
        operation: Operation,
        credentials: &Credentials,
        progress: &ProgressReporter,
    ) -> Result<TransportReply, TransferError> {
        let (bot_token, chat_id) = credentials.direct_pair().ok_or_else(|| {
            TransferError::BackendConfiguration(
                "a direct upload needs both a bot token and a chat id; set them or use the relay"
                    .to_string(),
            )
        })?;

        let api_root = credentials.api_root();
        let url = format!("{api_root}/bot{bot_token}/{}", operation.method_name());

        let mut form = UploadForm::new(
            operation.field_name(),
            request.file_name.clone(),
            request.file_bytes.clone(),
        )
        .text("chat_id", chat_id)
        .text("caption", request.caption.clone())
        .text("parse_mode", "Markdown");
        if let Some(mime_type) = guess_mime(&request.file_name) {
            form = form.mime_type(mime_type);
        }

        info!(
            operation = operation.method_name(),
            api_root = %api_root,
            size = request.file_size_bytes,
            "starting direct upload"
        );
        progress.report(0.0);

        self.transport
            .post_multipart(&url, form, Some(progress.bytes()))
            .await
            .map_err(|err| {
                TransferError::Network(format!(
                    "could not reach the Bot API at {api_root}: {err}; check the network, proxy settings or api_root"
                ))
            })
    }
}

pub(crate) fn accept_platform_reply(
    reply: &TransportReply,
    on_too_large: impl FnOnce() -> TransferError,
) -> Result<SentMessage, TransferError> {
    if reply.status == ENTITY_TOO_LARGE {
        return Err(on_too_large());
    }

    let parsed: PlatformReply = serde_json::from_str(&reply.body).map_err(|err| {
        TransferError::MalformedResponse(format!(
            "HTTP {} with a body that is not a Bot API reply ({err})",
            reply.status
        ))
    })?;

    if !parsed.ok {
        if parsed.error_code == Some(i64::from(ENTITY_TOO_LARGE)) {
            return Err(on_too_large());
        }
        let description = parsed
            .description
            .unwrap_or_else(|| format!("upload refused with HTTP {}", reply.status));
        warn!(status = reply.status, description = %description, "platform refused upload");
        return Err(TransferError::Protocol(description));
    }

    parsed.result.ok_or_else(|| {
        TransferError::MalformedResponse("reply was ok but carried no message".to_string())
    })
}

fn oversize_error() -> TransferError {
    TransferError::oversize(
        OFFICIAL_API_LIMIT_BYTES,
        format!(
            "file too large: the official Bot API accepts at most {} MB; point api_root at a self-hosted Bot API server to send files up to {} MB",
            megabytes(OFFICIAL_API_LIMIT_BYTES),
            megabytes(SELF_HOSTED_LIMIT_BYTES)
        ),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use linknexus_bridge::{InMemoryUploadTransport, TransportError, TransportReply};
    use linknexus_contract::{Credentials, ErrorKind, MediaKind, Operation, TransferRequest};

    use super::DirectExecutor;
    use crate::progress::tests::recording;

    const OK_VIDEO: &str = r#"{"ok":true,"result":{"message_id":42,"chat":{"id":-1001234567890},"video":{"file_id":"VID"}}}"#;

    fn request() -> TransferRequest {
        TransferRequest::new(
            "clip.mp4",
            Bytes::from_static(b"0123456789abcdef"),
            MediaKind::Video,
            "Filename: `clip.mp4`",
            Credentials::new("123:abc", "-1001234567890"),
        )
    }

    #[tokio::test]
    async fn builds_bot_api_request() {
        let transport = Arc::new(InMemoryUploadTransport::replying(Ok(TransportReply::new(
            200, OK_VIDEO,
        ))));
        let executor = DirectExecutor::new(transport.clone());
        let request = request();
        let credentials = request
            .credentials
            .clone()
            .with_api_root("http://127.0.0.1:8081/");

        let message = executor
            .execute(&request, Operation::SendVideo, &credentials, &crate::ProgressReporter::silent())
            .await
            .expect("upload accepted");
        assert_eq!(message.message_id, 42);

        let uploads = transport.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].url, "http://127.0.0.1:8081/bot123:abc/sendVideo");
        let form = &uploads[0].form;
        assert_eq!(form.file.field, "video");
        assert_eq!(form.file.file_name, "clip.mp4");
        assert_eq!(form.file.mime_type.as_deref(), Some("video/mp4"));
        assert_eq!(form.field("chat_id"), Some("-1001234567890"));
        assert_eq!(form.field("caption"), Some("Filename: `clip.mp4`"));
        assert_eq!(form.field("parse_mode"), Some("Markdown"));
    }

    #[tokio::test]
    async fn defaults_to_public_endpoint_and_photo_field() {
        let transport = Arc::new(InMemoryUploadTransport::replying(Ok(TransportReply::new(
            200,
            r#"{"ok":true,"result":{"message_id":1,"chat":{"id":5},"photo":[{"file_id":"P"}]}}"#,
        ))));
        let executor = DirectExecutor::new(transport.clone());
        let request = request();

        executor
            .execute(&request, Operation::SendPhoto, &request.credentials, &crate::ProgressReporter::silent())
            .await
            .expect("upload accepted");

        let upload = &transport.uploads()[0];
        assert_eq!(upload.url, "https://api.telegram.org/bot123:abc/sendPhoto");
        assert_eq!(upload.form.file.field, "photo");
    }

    #[tokio::test]
    async fn progress_is_exact_and_ends_at_hundred() {
        let transport = Arc::new(InMemoryUploadTransport::replying(Ok(TransportReply::new(
            200, OK_VIDEO,
        ))));
        let executor = DirectExecutor::new(transport);
        let request = request();
        let (reporter, samples) = recording();

        executor
            .execute(&request, Operation::SendVideo, &request.credentials, &reporter)
            .await
            .expect("upload accepted");

        assert_eq!(
            *samples.lock().expect("samples lock"),
            vec![0.0, 25.0, 50.0, 75.0, 100.0, 100.0]
        );
    }

    #[tokio::test]
    async fn negative_acknowledgement_after_full_progress_is_protocol_error() {
        let transport = Arc::new(InMemoryUploadTransport::replying(Ok(TransportReply::new(
            400,
            r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
        ))));
        let executor = DirectExecutor::new(transport);
        let request = request();
        let (reporter, samples) = recording();

        let error = executor
            .execute(&request, Operation::SendVideo, &request.credentials, &reporter)
            .await
            .expect_err("platform refused");

        assert_eq!(error.kind(), ErrorKind::Protocol);
        assert!(error.to_string().contains("chat not found"));
        assert_eq!(samples.lock().expect("samples lock").last(), Some(&100.0));
    }

    #[tokio::test]
    async fn entity_too_large_names_ceiling_and_alternative() {
        for reply in [
            TransportReply::new(413, "Request Entity Too Large"),
            TransportReply::new(
                400,
                r#"{"ok":false,"error_code":413,"description":"Request Entity Too Large"}"#,
            ),
        ] {
            let transport = Arc::new(InMemoryUploadTransport::replying(Ok(reply)));
            let executor = DirectExecutor::new(transport);
            let request = request();

            let error = executor
                .execute(&request, Operation::SendVideo, &request.credentials, &crate::ProgressReporter::silent())
                .await
                .expect_err("too large");

            assert_eq!(error.kind(), ErrorKind::Oversize);
            let message = error.to_string();
            assert!(message.contains("50 MB"), "{message}");
            assert!(message.contains("self-hosted"), "{message}");
        }
    }

    #[tokio::test]
    async fn transport_failure_is_network_error() {
        let transport = Arc::new(InMemoryUploadTransport::replying(Err(
            TransportError::Unreachable("connection refused".to_string()),
        )));
        let executor = DirectExecutor::new(transport);
        let request = request();

        let error = executor
            .execute(&request, Operation::SendVideo, &request.credentials, &crate::ProgressReporter::silent())
            .await
            .expect_err("unreachable");

        assert_eq!(error.kind(), ErrorKind::Network);
        assert!(error.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn unparsable_reply_is_malformed() {
        for reply in [
            TransportReply::new(502, "<html>Bad Gateway</html>"),
            TransportReply::new(200, r#"{"ok":true}"#),
            TransportReply::new(200, r#"{"ok":true,"result":{"chat":{"id":1}}}"#),
        ] {
            let transport = Arc::new(InMemoryUploadTransport::replying(Ok(reply)));
            let executor = DirectExecutor::new(transport);
            let request = request();

            let error = executor
                .execute(&request, Operation::SendVideo, &request.credentials, &crate::ProgressReporter::silent())
                .await
                .expect_err("malformed");

            assert_eq!(error.kind(), ErrorKind::MalformedResponse);
        }
    }

    #[tokio::test]
    async fn missing_credentials_never_touch_the_network() {
        let transport = Arc::new(InMemoryUploadTransport::new(1));
        let executor = DirectExecutor::new(transport.clone());
        let request = request();

        let error = executor
            .execute(&request, Operation::SendVideo, &Credentials::default(), &crate::ProgressReporter::silent())
            .await
            .expect_err("no credentials");

        assert_eq!(error.kind(), ErrorKind::BackendConfiguration);
        assert_eq!(transport.call_count(), 0);
    }
}
