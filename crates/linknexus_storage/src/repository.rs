use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use linknexus_contract::{HistoryLog, HistoryRecord, MediaKind};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!("sql/schema.sql");

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub sqlite_path: String,
}

#[derive(Debug, Clone)]
pub struct LinkNexusStorage {
    pool: SqlitePool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HistoryRow {
    pub record_id: String,
    pub filename: String,
    pub file_type: String,
    pub link: String,
    pub file_id: Option<String>,
    pub timestamp_ms: i64,
    pub size_bytes: i64,
    pub stored_at: String,
}

impl TryFrom<HistoryRow> for HistoryRecord {
    type Error = anyhow::Error;

    fn try_from(row: HistoryRow) -> Result<Self> {
        let file_type = MediaKind::from_str(&row.file_type)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("history record {} has a bad file type", row.record_id))?;
        let size = u64::try_from(row.size_bytes)
            .with_context(|| format!("history record {} has a negative size", row.record_id))?;

        Ok(HistoryRecord {
            filename: row.filename,
            file_type,
            link: row.link,
            file_id: row.file_id,
            timestamp: row.timestamp_ms,
            size,
        })
    }
}

impl LinkNexusStorage {
    pub async fn connect(config: &StorageConfig) -> Result<Self> {
        let uri = normalize_sqlite_uri(&config.sqlite_path);
        let options = SqliteConnectOptions::from_str(&uri)
            .with_context(|| format!("invalid sqlite URI: {}", uri))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("failed to connect sqlite pool")?;

        let storage = Self { pool };
        storage.migrate().await?;
        Ok(storage)
    }

    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA_SQL.split(';') {
            let sql = statement.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("migration failed for statement: {sql}"))?;
        }
        info!("linknexus sqlite schema ready");
        Ok(())
    }

    pub async fn append_history(&self, record: &HistoryRecord) -> Result<HistoryRow> {
        let record_id = Uuid::now_v7().to_string();
        let stored_at = Utc::now().to_rfc3339();
        let size = i64::try_from(record.size).context("history record size overflows i64")?;

        sqlx::query(
            "INSERT INTO history(record_id, filename, file_type, link, file_id, timestamp_ms, size_bytes, stored_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record_id)
        .bind(&record.filename)
        .bind(record.file_type.type_tag())
        .bind(&record.link)
        .bind(record.file_id.as_deref())
        .bind(record.timestamp)
        .bind(size)
        .bind(&stored_at)
        .execute(&self.pool)
        .await
        .context("insert history record")?;

        self.get_history(&record_id)
            .await?
            .context("history record missing after insert")
    }

    pub async fn get_history(&self, record_id: &str) -> Result<Option<HistoryRow>> {
        sqlx::query_as::<_, HistoryRow>(
            "SELECT record_id, filename, file_type, link, file_id, timestamp_ms, size_bytes, stored_at FROM history WHERE record_id = ?",
        )
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("query history record {record_id}"))
    }

    pub async fn list_history(&self, limit: i64) -> Result<Vec<HistoryRow>> {
        sqlx::query_as::<_, HistoryRow>(
            "SELECT record_id, filename, file_type, link, file_id, timestamp_ms, size_bytes, stored_at FROM history ORDER BY timestamp_ms DESC, rowid DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("query history")
    }
}

#[async_trait]
impl HistoryLog for LinkNexusStorage {
    async fn append(&self, record: HistoryRecord) -> Result<()> {
        self.append_history(&record).await.map(|_| ())
    }

    async fn list(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.list_history(limit)
            .await?
            .into_iter()
            .map(HistoryRecord::try_from)
            .collect()
    }
}

fn normalize_sqlite_uri(raw: &str) -> String {
    if raw.starts_with("sqlite:") {
        raw.to_string()
    } else {
        format!("sqlite://{raw}")
    }
}
