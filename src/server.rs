//! HTTP server for uploads and job polling.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/upload-json` | Ingest a batch of price records |
//! | `GET`  | `/jobs/{id}` | Job status, progress and results |
//! | `GET`  | `/brands` | Distinct product brands, sorted |
//! | `GET`  | `/categories` | Distinct product categories, sorted |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Every error response is a JSON object with a single message:
//!
//! ```json
//! { "error": "UNIQUE constraint failed: scraping_jobs.id" }
//! ```
//!
//! A malformed upload body, an oversize batch and a job that cannot be
//! created all answer `400`; a body over `[server].max_body_bytes` answers
//! `413`. Per-record failures never change the status:
//! they are reported in the `results` array of a `200` response.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted. Pre-flight `OPTIONS`
//! requests get an empty body with the CORS headers.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::db;
use crate::error::IngestError;
use crate::ingest::{check_batch, ingest_batch};
use crate::migrate;
use crate::models::{BatchSummary, IngestionJob, UploadRequest};
use crate::progress::NoProgress;
use crate::sqlite_store::SqliteStore;
use crate::store::PriceStore;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn PriceStore>,
    max_batch_records: usize,
}

/// Starts the HTTP server on `[server].bind` against the configured SQLite
/// database, creating the schema if needed. Runs until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    let store: Arc<dyn PriceStore> = Arc::new(SqliteStore::new(pool.clone()));

    let app = build_router(store, config);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "autoprice server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    pool.close().await;
    Ok(())
}

/// Builds the router over any [`PriceStore`].
pub fn build_router(store: Arc<dyn PriceStore>, config: &Config) -> Router {
    let state = AppState {
        store,
        max_batch_records: config.ingest.max_batch_records,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/upload-json", post(handle_upload))
        .route("/jobs/{id}", get(handle_get_job))
        .route("/brands", get(handle_brands))
        .route("/categories", get(handle_categories))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Converts into `{ "error": message }` with the given status.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), message = %self.message, "Request failed");
        } else {
            warn!(status = self.status.as_u16(), message = %self.message, "Request rejected");
        }
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: err.to_string(),
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        bad_request(err.to_string())
    }
}

// ============ POST /upload-json ============

/// The body is parsed here rather than by the `Json` extractor so that any
/// parse failure answers `400 {error}`. A body over `max_body_bytes` keeps
/// axum's `413` but with the same JSON error shape.
///
/// The batch runs on its own task: a client that disconnects mid-batch must
/// not leave the job stuck in `processing`.
async fn handle_upload(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<BatchSummary>, ApiError> {
    let body = body.map_err(|rejection| ApiError {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;
    let request: UploadRequest =
        serde_json::from_slice(&body).map_err(|e| bad_request(e.to_string()))?;

    check_batch(
        &request.batch_id,
        request.json_data.len(),
        state.max_batch_records,
    )?;

    let store = state.store.clone();
    let batch = tokio::spawn(async move {
        ingest_batch(
            store.as_ref(),
            &request.batch_id,
            request.json_data,
            &NoProgress,
        )
        .await
    });

    let summary = batch
        .await
        .map_err(|e| internal(anyhow::anyhow!("ingestion task failed: {}", e)))??;

    Ok(Json(summary))
}

// ============ GET /jobs/{id} ============

async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<IngestionJob>, ApiError> {
    state
        .store
        .get_job(&id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found(format!("job not found: {}", id)))
}

// ============ GET /brands, /categories ============

async fn handle_brands(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    state.store.list_brands().await.map(Json).map_err(internal)
}

async fn handle_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    state.store.list_categories().await.map(Json).map_err(internal)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
