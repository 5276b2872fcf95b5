use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use selfindex::error::{BuildError, PersistenceError, QueryError};
use selfindex::{Document, EngineStats, Error, SearchEngine};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub k: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: String,
    pub score: Option<f32>,
    pub title: Option<String>,
    pub url: Option<String>,
}

/// Body of `POST /index/batch`.
#[derive(Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub add: Vec<Document>,
    #[serde(default)]
    pub remove: Vec<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub admin_token: Option<String>,
}

/// Engine error mapped onto an HTTP status with a JSON body.
pub struct ApiError(StatusCode, String);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = match &e {
            Error::Query(QueryError::Parse { .. }) | Error::Configuration(_) => StatusCode::BAD_REQUEST,
            Error::Query(QueryError::IndexNotLoaded) | Error::Build(BuildError::NotReady) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Build(BuildError::Busy | BuildError::DuplicateDocument(_)) => StatusCode::CONFLICT,
            Error::Build(BuildError::UnknownDocument(_)) => StatusCode::NOT_FOUND,
            Error::Persistence(PersistenceError::IndexNotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

/// Router over `engine`, with the admin token taken from `ADMIN_TOKEN`.
pub fn build_app(engine: Arc<SearchEngine>) -> Router {
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    router(AppState { engine, admin_token })
}

pub fn router(app_state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/stats", get(stats_handler))
        .route("/index/batch", post(index_batch))
        .route("/index/commit", post(index_commit))
        .with_state(app_state)
        .layer(cors)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let engine = Arc::clone(&state.engine);
    let q = params.q.clone();
    let hits = tokio::task::spawn_blocking(move || {
        let k = params.k.unwrap_or(engine.config().default_top_k);
        engine.query_documents(&q, k)
    })
    .await
    .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;
    let results: Vec<SearchHit> = hits
        .into_iter()
        .map(|(hit, meta)| SearchHit { doc_id: hit.doc_id, score: hit.score, title: meta.title, url: meta.url })
        .collect();
    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits: results.len(), results }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match state.engine.document(&doc_id)? {
        Some(meta) => Ok(Json(serde_json::to_value(meta).unwrap_or_default())),
        None => Err(ApiError(StatusCode::NOT_FOUND, format!("no document {doc_id:?}"))),
    }
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<EngineStats> { Json(state.engine.stats()) }

async fn index_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(batch): Json<BatchRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let engine = Arc::clone(&state.engine);
    let report = tokio::task::spawn_blocking(move || engine.update(&batch.remove, batch.add))
        .await
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;
    tracing::info!(processed = report.processed, removed = report.removed, "batch applied");
    Ok(Json(serde_json::to_value(report).unwrap_or_default()))
}

async fn index_commit(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let engine = Arc::clone(&state.engine);
    tokio::task::spawn_blocking(move || engine.save())
        .await
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))??;
    Ok(Json(serde_json::json!({ "committed": state.engine.descriptor().short_id() })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError(StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError(StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
