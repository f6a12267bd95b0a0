use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Called with `(bytes_sent, bytes_total)` as the file part is written out.
pub type ByteProgress = Arc<dyn Fn(u64, u64) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadForm {
    pub fields: Vec<(String, String)>,
    pub file: FilePart,
}

impl UploadForm {
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            fields: Vec::new(),
            file: FilePart {
                field: field.into(),
                file_name: file_name.into(),
                mime_type: None,
                bytes,
            },
        }
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.file.mime_type = Some(mime_type.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportReply {
    pub status: u16,
    pub body: String,
}

impl TransportReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("invalid upload request: {0}")]
    InvalidRequest(String),
}

#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn post_multipart(
        &self,
        url: &str,
        form: UploadForm,
        on_bytes: Option<ByteProgress>,
    ) -> Result<TransportReply, TransportError>;
}
