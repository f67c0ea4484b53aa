//! JSON HTTP server.
//!
//! Exposes [`QueryEngine::submit`] to browser and service clients.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ask` | Answer a question: `{"query": "...", "dataset": "<id>"?}` |
//! | `GET`  | `/datasets` | List imported collections, newest first |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! Passing `dataset` switches the server's active dataset for this and
//! every later request. Questions are answered one at a time.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404, unknown `dataset`),
//! `internal` (500, storage failures).
//! A question the engine cannot answer is not an HTTP error: it comes back
//! as a 200 with `"success": false` and an explanatory `answer`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::db;
use crate::engine::QueryEngine;
use crate::error::QueryError;
use crate::llm::create_model;
use crate::models::{Collection, QueryResult};
use crate::sqlite_store::SqliteStore;
use crate::store::RecordStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<Mutex<QueryEngine>>,
    store: Arc<dyn RecordStore>,
}

impl AppState {
    pub fn new(engine: QueryEngine, store: Arc<dyn RecordStore>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            store,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ask", post(handle_ask))
        .route("/datasets", get(handle_datasets))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::open(config).await?;
    let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::new(pool));
    let model = create_model(&config.llm)?;
    let engine = QueryEngine::new(store.clone(), Arc::from(model), config.query.clone());

    let app = router(AppState::new(engine, store));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, llm = %config.llm.provider, "server started");
    println!("rq server listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ Handlers ============

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

#[derive(Serialize)]
struct DatasetsResponse {
    datasets: Vec<Collection>,
}

async fn handle_datasets(State(state): State<AppState>) -> Result<Json<DatasetsResponse>, AppError> {
    let datasets = state
        .store
        .list_collections()
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(DatasetsResponse { datasets }))
}

#[derive(Deserialize)]
pub struct AskRequest {
    query: String,
    #[serde(default)]
    dataset: Option<String>,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<QueryResult>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let mut engine = state.engine.lock().await;
    if let Some(id) = req.dataset.as_deref() {
        engine.use_dataset(id).await.map_err(|e| match e {
            QueryError::UnknownDataset(_) => not_found(e.to_string()),
            other => internal(other.to_string()),
        })?;
    }
    Ok(Json(engine.submit(&req.query).await))
}
