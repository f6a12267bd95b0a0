use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::TransferLink;

pub type TransferOutcome = Result<TransferLink, TransferError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Oversize,
    Network,
    Protocol,
    MalformedResponse,
    BackendConfiguration,
    BackendCrash,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransferError {
    #[error("{message}")]
    Oversize { limit_bytes: u64, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("platform rejected the upload: {0}")]
    Protocol(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("relay configuration error: {0}")]
    BackendConfiguration(String),
    #[error("relay failure: {0}")]
    BackendCrash(String),
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransferError::Oversize { .. } => ErrorKind::Oversize,
            TransferError::Network(_) => ErrorKind::Network,
            TransferError::Protocol(_) => ErrorKind::Protocol,
            TransferError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            TransferError::BackendConfiguration(_) => ErrorKind::BackendConfiguration,
            TransferError::BackendCrash(_) => ErrorKind::BackendCrash,
        }
    }

    pub fn oversize(limit_bytes: u64, message: impl Into<String>) -> Self {
        TransferError::Oversize {
            limit_bytes,
            message: message.into(),
        }
    }
}

pub fn megabytes(bytes: u64) -> u64 {
    bytes / (1024 * 1024)
}
