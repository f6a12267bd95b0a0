use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use tracing::debug;

use crate::transport::{
    ByteProgress, FilePart, TransportError, TransportReply, UploadForm, UploadTransport,
};

const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct HttpUploadTransport {
    client: Client,
}

impl HttpUploadTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .build()
            .map_err(|err| TransportError::InvalidRequest(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UploadTransport for HttpUploadTransport {
    async fn post_multipart(
        &self,
        url: &str,
        form: UploadForm,
        on_bytes: Option<ByteProgress>,
    ) -> Result<TransportReply, TransportError> {
        let mut multipart = Form::new();
        for (name, value) in form.fields {
            multipart = multipart.text(name, value);
        }
        let field = form.file.field.clone();
        multipart = multipart.part(field, file_part(form.file, on_bytes)?);

        let response = self
            .client
            .post(url)
            .multipart(multipart)
            .send()
            .await
            .map_err(|err| TransportError::Unreachable(describe_reqwest_error(&err)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError::Unreachable(describe_reqwest_error(&err)))?;

        debug!(status, body_len = body.len(), "multipart upload answered");
        Ok(TransportReply { status, body })
    }
}

fn file_part(file: FilePart, on_bytes: Option<ByteProgress>) -> Result<Part, TransportError> {
    let total = file.bytes.len() as u64;
    let mut sent = 0u64;
    let chunks = stream::iter(chunk(file.bytes)).map(move |piece| {
        sent += piece.len() as u64;
        if let Some(report) = &on_bytes {
            report(sent, total);
        }
        Ok::<Bytes, std::io::Error>(piece)
    });

    let part = Part::stream_with_length(Body::wrap_stream(chunks), total).file_name(file.file_name);
    match file.mime_type {
        Some(mime_type) => part
            .mime_str(&mime_type)
            .map_err(|err| TransportError::InvalidRequest(err.to_string())),
        None => Ok(part),
    }
}

fn chunk(bytes: Bytes) -> Vec<Bytes> {
    (0..bytes.len())
        .step_by(CHUNK_SIZE)
        .map(|start| bytes.slice(start..(start + CHUNK_SIZE).min(bytes.len())))
        .collect()
}

fn describe_reqwest_error(err: &reqwest::Error) -> String {
    if err.is_connect() {
        format!("connection failed: {err}")
    } else if err.is_timeout() {
        format!("timed out: {err}")
    } else {
        err.to_string()
    }
}
