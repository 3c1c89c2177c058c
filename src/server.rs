//! JSON HTTP API over the resolver and synchronizer.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/api/reports/{channel}` | All report summaries of a channel |
//! | `GET`    | `/api/report/{id}?channel=` | One report with full content |
//! | `DELETE` | `/api/report/{id}?channel=` | Delete a report remotely and locally |
//!
//! # Response Envelope
//!
//! ```json
//! { "ok": true, "data": ... }
//! { "ok": false, "message": "report not found" }
//! ```
//!
//! Unknown channels and unacceptable file names are `400`, unresolvable
//! identifiers are `404`, and a deletion that cannot be persisted is `500`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the site's pages can
//! call the API from another origin.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use daily_digest_core::{slug, Channel, ReportDetail, ReportSummary, SlugError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::object_store::OssClient;
use crate::resolver::ReportResolver;
use crate::sync::{remove_report, IndexSynchronizer, RemovalReport};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub resolver: Arc<ReportResolver>,
    /// `None` when object storage is not configured; deletions are then
    /// local only.
    pub sync: Option<Arc<IndexSynchronizer>>,
}

impl AppState {
    /// Production state: HTTP fetcher, daily report extractor, and an OSS
    /// backed synchronizer when credentials are usable.
    pub fn from_config(config: Arc<Config>) -> anyhow::Result<Self> {
        let resolver = Arc::new(ReportResolver::from_config(config.clone())?);
        let sync = match OssClient::new(&config.storage) {
            Ok(client) => Some(Arc::new(IndexSynchronizer::new(
                Arc::new(client),
                config.clone(),
            ))),
            Err(e) => {
                tracing::info!(reason = %e, "remote deletion disabled");
                None
            }
        };
        Ok(Self {
            config,
            resolver,
            sync,
        })
    }
}

/// Routes with CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/reports/{channel}", get(handle_list_reports))
        .route(
            "/api/report/{id}",
            get(handle_get_report).delete(handle_delete_report),
        )
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `[server].bind` until the process is terminated.
pub async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(AppState::from_config(config)?);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening");
    println!("Daily digest API listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Envelope ============

#[derive(Serialize)]
struct Envelope<T> {
    ok: bool,
    data: T,
}

fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { ok: true, data })
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            ok: false,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: message.into(),
    }
}

fn parse_channel(raw: &str) -> Result<Channel, AppError> {
    raw.parse().map_err(|e: String| bad_request(e))
}

#[derive(Debug, Deserialize)]
struct ChannelQuery {
    channel: Option<String>,
}

impl ChannelQuery {
    fn channel(&self) -> Result<Option<Channel>, AppError> {
        match self.channel.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => parse_channel(raw).map(Some),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<Envelope<HealthResponse>> {
    ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ GET /api/reports/{channel} ============

async fn handle_list_reports(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> Result<Json<Envelope<Vec<ReportSummary>>>, AppError> {
    let channel = parse_channel(&channel)?;
    Ok(ok(state.resolver.all_reports(channel).await))
}

// ============ GET /api/report/{id} ============

async fn handle_get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ChannelQuery>,
) -> Result<Json<Envelope<ReportDetail>>, AppError> {
    let preferred = query.channel()?;
    let detail = state
        .resolver
        .report_by_slug(&id, preferred)
        .await
        .map_err(|_| not_found("report not found"))?;
    Ok(ok(detail))
}

// ============ DELETE /api/report/{id} ============

/// Deletes the report named by `id`.
///
/// Without `?channel=`, the first channel in search order whose naming
/// rules the file satisfies is used. With it, the file must qualify for
/// that channel.
async fn handle_delete_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ChannelQuery>,
) -> Result<Json<Envelope<RemovalReport>>, AppError> {
    let preferred = query.channel()?;
    let file_name = slug::decode(&id).map_err(|_| not_found("report not found"))?;
    let candidates = match preferred {
        Some(channel) => vec![channel],
        None => Channel::search_order(None),
    };
    let channel = candidates
        .into_iter()
        .find(|c| c.qualifies(&file_name))
        .ok_or_else(|| not_found("report not found"))?;

    let report = remove_report(
        state.sync.as_deref(),
        state.config.local.report_dirs(),
        channel,
        &file_name,
    )
    .await
    .map_err(|e| {
        if e.downcast_ref::<SlugError>().is_some() {
            bad_request(e.to_string())
        } else {
            tracing::warn!(%channel, file = %file_name, error = %e, "deletion failed");
            internal(format!("{:#}", e))
        }
    })?;

    if !report.removed_anything() {
        return Err(not_found("report not found"));
    }
    Ok(ok(report))
}
