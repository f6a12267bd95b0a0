use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::transport::{ByteProgress, TransportError, TransportReply, UploadForm, UploadTransport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub url: String,
    pub form: UploadForm,
}

/// Transport that answers from a queue of scripted replies and records every
/// upload it receives. Byte progress is reported in `progress_steps` equal
/// slices before the reply is returned.
#[derive(Debug)]
pub struct InMemoryUploadTransport {
    replies: Mutex<VecDeque<Result<TransportReply, TransportError>>>,
    uploads: Mutex<Vec<RecordedUpload>>,
    progress_steps: u64,
}

impl InMemoryUploadTransport {
    pub fn new(progress_steps: u64) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            uploads: Mutex::new(Vec::new()),
            progress_steps: progress_steps.max(1),
        }
    }

    pub fn replying(reply: Result<TransportReply, TransportError>) -> Self {
        let transport = Self::new(4);
        transport.push_reply(reply);
        transport
    }

    pub fn push_reply(&self, reply: Result<TransportReply, TransportError>) {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(reply);
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.uploads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[async_trait]
impl UploadTransport for InMemoryUploadTransport {
    async fn post_multipart(
        &self,
        url: &str,
        form: UploadForm,
        on_bytes: Option<ByteProgress>,
    ) -> Result<TransportReply, TransportError> {
        let total = form.file.bytes.len() as u64;
        self.uploads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedUpload {
                url: url.to_string(),
                form,
            });

        if let Some(report) = on_bytes {
            for step in 1..=self.progress_steps {
                report(total * step / self.progress_steps, total);
            }
        }

        let next = self
            .replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        info!(url = %url, scripted = next.is_some(), "in-memory upload received");
        next.unwrap_or_else(|| {
            Err(TransportError::Unreachable(
                "no scripted reply left".to_string(),
            ))
        })
    }
}
