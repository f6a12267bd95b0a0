use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use linknexus_contract::{HistoryLog, HistoryRecord};
use reqwest::Client;
use std::time::Duration;

pub const HISTORY_PATH: &str = "/api/history";

#[derive(Debug, Clone)]
pub struct HttpHistoryLog {
    client: Client,
    url: String,
}

impl HttpHistoryLog {
    pub fn new(relay_base: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to create history HTTP client")?;

        Ok(Self {
            client,
            url: format!("{}{HISTORY_PATH}", relay_base.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl HistoryLog for HttpHistoryLog {
    async fn append(&self, record: HistoryRecord) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&record)
            .send()
            .await
            .with_context(|| format!("failed to send history record to {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("history append failed with status {status}: {detail}"));
        }
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("limit", limit.to_string())])
            .send()
            .await
            .with_context(|| format!("failed to fetch history from {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("history list failed with status {status}"));
        }

        response
            .json::<Vec<HistoryRecord>>()
            .await
            .context("history response is not a list of records")
    }
}
