mod config;

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use linknexus_bridge::HttpUploadTransport;
use linknexus_contract::{HistoryLog, MediaKind, TransferRequest};
use linknexus_relay::{build_router, AppState, RelayLimits};
use linknexus_storage::{LinkNexusStorage, StorageConfig};
use linknexus_transfer::{
    compose_caption, guess_mime, ContentDescriber, DirectExecutor, Dispatcher, GeminiDescriber,
    HttpHistoryLog, MediaMetadata, ProgressReporter, RelayedExecutor,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{ClientConfig, RelayConfig, GEMINI_KEY_ENV};

const FALLBACK_MIME: &str = "application/octet-stream";

#[derive(Debug, Parser)]
#[command(author, version, about = "Send media to Telegram directly or through a relay")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the backend relay.
    Serve {
        #[arg(long, default_value = "config/relay.toml")]
        config: PathBuf,
    },
    /// Upload one file and print its link and file id.
    Upload {
        path: PathBuf,
        /// Caption to send instead of the generated one.
        #[arg(long)]
        caption: Option<String>,
        /// Override the media kind inferred from the file name.
        #[arg(long, value_parser = parse_kind)]
        kind: Option<MediaKind>,
        /// Describe the file with Gemini before uploading.
        #[arg(long)]
        describe: bool,
        #[arg(long, default_value = "config/client.toml")]
        config: PathBuf,
    },
    /// List recent uploads recorded by the relay.
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value = "config/client.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { config } => serve(config).await,
        Command::Upload {
            path,
            caption,
            kind,
            describe,
            config,
        } => upload(&path, caption, kind, describe, &config).await,
        Command::History { limit, config } => history(limit, &config).await,
    }
}

async fn serve(config_path: PathBuf) -> Result<()> {
    let mut config: RelayConfig = config::load(&config_path)?;
    config.apply_env(|key| std::env::var(key).ok());

    if config.upstream.direct_pair().is_none() {
        warn!("relay has no upstream bot token or chat id; uploads will be refused");
    }

    if let Some(parent) = Path::new(&config.storage.sqlite_path)
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty() && !config.storage.sqlite_path.starts_with("sqlite:"))
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let storage = LinkNexusStorage::connect(&StorageConfig {
        sqlite_path: config.storage.sqlite_path.clone(),
    })
    .await?;

    let transport = HttpUploadTransport::new().context("failed to create upstream HTTP client")?;
    let limits = RelayLimits {
        upload_limit_bytes: config.upload_limit_bytes(),
    };
    let state = AppState::new(
        DirectExecutor::new(Arc::new(transport)),
        config.upstream.clone(),
        Arc::new(storage),
        limits,
    );
    let app = build_router(state);

    let socket: SocketAddr = config
        .http
        .bind
        .parse()
        .with_context(|| format!("invalid socket address {}", config.http.bind))?;
    if !socket.ip().is_loopback() {
        warn!(bind = %socket, "relay is reachable beyond loopback and has no authentication");
    }

    let listener = tokio::net::TcpListener::bind(socket)
        .await
        .with_context(|| format!("failed to bind {}", config.http.bind))?;

    info!(
        bind = %config.http.bind,
        upload_limit_bytes = limits.upload_limit_bytes,
        "linknexus relay listening"
    );
    axum::serve(listener, app).await.context("axum server failed")
}

async fn upload(
    path: &Path,
    caption: Option<String>,
    kind: Option<MediaKind>,
    describe: bool,
    config_path: &Path,
) -> Result<()> {
    // read on every dispatch so credential edits apply without a restart
    let config = config::load_client(config_path)?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?
        .to_string();
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mime_type = guess_mime(&file_name).unwrap_or_else(|| FALLBACK_MIME.to_string());
    let media_kind = kind.unwrap_or_else(|| MediaKind::from_mime(&mime_type));

    let caption = match caption {
        Some(caption) => caption,
        None => {
            let metadata = if describe || config.describe.enabled {
                describe_media(&config, &bytes, &mime_type).await
            } else {
                None
            };
            compose_caption(&file_name, bytes.len() as u64, metadata.as_ref())
        }
    };

    let transport = Arc::new(HttpUploadTransport::new()?);
    let relayed = RelayedExecutor::new(transport.clone(), &config.relay.base_url)
        .with_limit(config.relay.limit_bytes);
    let history = Arc::new(HttpHistoryLog::new(&config.relay.base_url)?);
    let dispatcher = Dispatcher::new(DirectExecutor::new(transport), relayed, history);

    let request = TransferRequest::new(
        file_name,
        bytes,
        media_kind,
        caption,
        config.telegram.clone(),
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let outcome = dispatcher
        .dispatch_cancellable(&request, &whole_percent_progress(), &cancel)
        .await;
    let link = outcome.map_err(|err| {
        let kind = err.kind();
        anyhow!(err).context(format!("upload failed ({kind:?})"))
    })?;

    println!("{}", serde_json::to_string_pretty(&link)?);
    Ok(())
}

async fn describe_media(config: &ClientConfig, bytes: &[u8], mime_type: &str) -> Option<MediaMetadata> {
    let Ok(api_key) = std::env::var(GEMINI_KEY_ENV) else {
        warn!("{GEMINI_KEY_ENV} is not set; using the plain caption");
        return None;
    };

    let mut describer = match GeminiDescriber::new(api_key) {
        Ok(describer) => describer,
        Err(err) => {
            warn!(error = %err, "could not create describer; using the plain caption");
            return None;
        }
    };
    if let Some(model) = &config.describe.model {
        describer = describer.with_model(model.clone());
    }
    if let Some(api_base) = &config.describe.api_base {
        describer = describer.with_api_base(api_base.clone());
    }

    match describer.describe(bytes, mime_type).await {
        Ok(metadata) => {
            info!(title = %metadata.title, "media described");
            Some(metadata)
        }
        Err(err) => {
            warn!(error = %err, "description failed; using the plain caption");
            None
        }
    }
}

/// Logs progress once per whole percent; byte callbacks fire per chunk.
fn whole_percent_progress() -> ProgressReporter {
    let last = AtomicU64::new(u64::MAX);
    ProgressReporter::new(move |percent| {
        let whole = percent.floor() as u64;
        if last.swap(whole, Ordering::Relaxed) != whole {
            info!(percent = whole, "upload progress");
        }
    })
}

async fn history(limit: usize, config_path: &Path) -> Result<()> {
    let config = config::load_client(config_path)?;
    let log = HttpHistoryLog::new(&config.relay.base_url)?;
    let records = log.list(limit).await?;

    if records.is_empty() {
        info!("no uploads recorded yet");
    }
    for record in records {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            record.timestamp,
            record.file_type,
            record.filename,
            record.link,
            record.file_id.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn parse_kind(raw: &str) -> Result<MediaKind, String> {
    raw.parse()
}
