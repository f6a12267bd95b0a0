use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::media::MediaKind;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub filename: String,
    pub file_type: MediaKind,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub size: u64,
}

#[async_trait]
pub trait HistoryLog: Send + Sync {
    async fn append(&self, record: HistoryRecord) -> Result<()>;

    /// Most recent first.
    async fn list(&self, limit: usize) -> Result<Vec<HistoryRecord>>;
}
