use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use chrono::Utc;
use linknexus_contract::{Credentials, HistoryLog, HistoryRecord, MediaKind, TransferRequest};
use linknexus_transfer::{operation_for, DirectExecutor, ProgressReporter, DEFAULT_RELAY_LIMIT_BYTES};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

// headroom for multipart boundaries and the text fields
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct RelayLimits {
    pub upload_limit_bytes: u64,
}

impl Default for RelayLimits {
    fn default() -> Self {
        Self {
            upload_limit_bytes: DEFAULT_RELAY_LIMIT_BYTES,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

#[derive(Clone)]
pub struct AppState {
    pub forwarder: DirectExecutor,
    pub upstream: Arc<Credentials>,
    pub history: Arc<dyn HistoryLog>,
    pub limits: RelayLimits,
}

impl AppState {
    pub fn new(
        forwarder: DirectExecutor,
        upstream: Credentials,
        history: Arc<dyn HistoryLog>,
        limits: RelayLimits,
    ) -> Self {
        Self {
            forwarder,
            upstream: Arc::new(upstream),
            history,
            limits,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.limits.upload_limit_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/health/live", get(health_live))
        .route("/health/ready", get(health_ready))
        .route(
            "/api/upload",
            post(upload).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/history", get(list_history).post(append_history))
        .with_state(state)
}

async fn health_live() -> impl IntoResponse {
    Json(json!({
        "status": "live",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.upstream.direct_pair().is_some();
    let payload = Json(json!({
        "status": if ready { "ready" } else { "missing_upstream_credentials" },
        "timestamp": Utc::now().to_rfc3339()
    }));

    if ready {
        (StatusCode::OK, payload).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, payload).into_response()
    }
}

struct RelayUpload {
    file_name: String,
    content_type: Option<String>,
    bytes: Bytes,
    caption: String,
    type_tag: Option<String>,
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let form = read_upload(&mut multipart).await?;

    let media_kind = match form.type_tag.as_deref() {
        Some(tag) => tag
            .parse::<MediaKind>()
            .map_err(|reason| error_body(StatusCode::BAD_REQUEST, &reason))?,
        None => form
            .content_type
            .as_deref()
            .map(MediaKind::from_mime)
            .unwrap_or(MediaKind::Video),
    };

    let limit = state.limits.upload_limit_bytes;
    if form.bytes.len() as u64 > limit {
        return Err(error_body(
            StatusCode::PAYLOAD_TOO_LARGE,
            &format!("file exceeds the relay limit of {limit} bytes"),
        ));
    }

    if state.upstream.direct_pair().is_none() {
        error!("upload refused: relay has no upstream credentials");
        return Err(error_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "relay has no upstream bot token or chat id configured",
        ));
    }

    info!(
        file = %form.file_name,
        media_kind = %media_kind,
        size = form.bytes.len(),
        "forwarding relayed upload"
    );

    let request = TransferRequest::new(
        form.file_name,
        form.bytes,
        media_kind,
        form.caption,
        state.upstream.as_ref().clone(),
    );
    let reply = state
        .forwarder
        .send(
            &request,
            operation_for(media_kind),
            &state.upstream,
            &ProgressReporter::silent(),
        )
        .await
        .map_err(|err| {
            warn!(error = %err, "upstream upload failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": err.to_string(), "kind": err.kind() })),
            )
        })?;

    if reply.status == StatusCode::PAYLOAD_TOO_LARGE.as_u16() {
        return Err(error_body(
            StatusCode::PAYLOAD_TOO_LARGE,
            "upstream rejected the file as too large",
        ));
    }

    // platform replies are passed through verbatim, negative ones included
    match serde_json::from_str::<Value>(&reply.body) {
        Ok(Value::Object(body)) if body.contains_key("ok") => Ok((
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            reply.body,
        )
            .into_response()),
        _ => Err(error_body(
            StatusCode::BAD_GATEWAY,
            &format!(
                "upstream answered HTTP {} with a body that is not a Bot API reply",
                reply.status
            ),
        )),
    }
}

async fn read_upload(multipart: &mut Multipart) -> Result<RelayUpload, (StatusCode, Json<Value>)> {
    let mut file = None;
    let mut caption = String::new();
    let mut type_tag = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload.bin").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, content_type, bytes));
            }
            Some("caption") => caption = field.text().await.map_err(multipart_error)?,
            Some("type") => type_tag = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| error_body(StatusCode::BAD_REQUEST, "multipart field 'file' is missing"))?;

    Ok(RelayUpload {
        file_name,
        content_type,
        bytes,
        caption,
        type_tag,
    })
}

async fn list_history(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let records = state.history.list(limit).await.map_err(internal_error)?;
    Ok((StatusCode::OK, Json(records)))
}

async fn append_history(
    State(state): State<AppState>,
    Json(record): Json<HistoryRecord>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    info!(file = %record.filename, link = %record.link, "history record appended");
    state.history.append(record).await.map_err(internal_error)?;
    Ok((StatusCode::CREATED, Json(json!({ "status": "ok" }))))
}

fn multipart_error(err: MultipartError) -> (StatusCode, Json<Value>) {
    error_body(err.status(), &err.body_text())
}

fn error_body(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

fn internal_error(error: anyhow::Error) -> (StatusCode, Json<Value>) {
    error!(error = %error, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal_error", "detail": error.to_string() })),
    )
}
