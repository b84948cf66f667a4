use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use parking_lot::RwLock;
use searchindex::persist;
use searchindex::query::{search, SearchHit};
use searchindex::{registry, DocId, SearchIndex};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_ms: u128,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct TermResponse {
    pub term: String,
    pub docs: Vec<DocId>,
    pub title_docs: Vec<DocId>,
}

#[derive(Clone)]
pub struct AppState {
    pub source: PathBuf,
    pub index: Arc<RwLock<Arc<SearchIndex>>>,
    pub admin_token: Option<String>,
    /// Reject indexes that fail the structural checks, at startup and on reload.
    pub strict: bool,
}

impl AppState {
    fn snapshot(&self) -> Arc<SearchIndex> {
        self.index.read().clone()
    }
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(serde_json::json!({ "error": msg.into() })))
}

fn open_index(source: &std::path::Path, strict: bool) -> Result<SearchIndex> {
    if strict { persist::open_strict(source) } else { persist::open(source) }
}

pub fn build_app(index_path: impl Into<PathBuf>) -> Result<Router> {
    build_app_with(index_path, false)
}

pub fn build_app_with(index_path: impl Into<PathBuf>, strict: bool) -> Result<Router> {
    let source = index_path.into();
    let index = registry::set_index(open_index(&source, strict)?);
    tracing::info!(source = %source.display(), docs = index.num_docs(), "index loaded");
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let app_state = AppState { source, index: Arc::new(RwLock::new(index)), admin_token, strict };
    Ok(router(app_state))
}

pub fn router(app_state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
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
        .route("/terms/:term", get(terms_handler))
        .route("/envversion", get(envversion_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Json<SearchResponse> {
    let start = std::time::Instant::now();
    let index = state.snapshot();
    let hits = search(&index, &params.q);
    let total_hits = hits.len();
    let k = params.k.clamp(1, 100);
    let results: Vec<SearchHit> = hits.into_iter().take(k).collect();
    let elapsed = start.elapsed();
    Json(SearchResponse { query: params.q, took_ms: elapsed.as_millis(), took_s: elapsed.as_secs_f64(), total_hits, results })
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<serde_json::Value>, ApiError> {
    let index = state.snapshot();
    let doc = index.document(doc_id).ok_or_else(|| error(StatusCode::NOT_FOUND, "not found"))?;
    Ok(Json(serde_json::json!({
        "doc_id": doc.id,
        "docname": doc.docname,
        "filename": doc.filename,
        "title": doc.title,
    })))
}

pub async fn terms_handler(State(state): State<AppState>, Path(term): Path<String>) -> Json<TermResponse> {
    let index = state.snapshot();
    let docs = index.docs_for_term(&term).to_vec();
    let title_docs = index.docs_for_title_term(&term).to_vec();
    Json(TermResponse { term, docs, title_docs })
}

pub async fn envversion_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!(state.snapshot().envversion))
}

// --- Admin endpoints ---
async fn reload_handler(State(state): State<AppState>, headers: axum::http::HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let fresh = open_index(&state.source, state.strict).map_err(|e| {
        tracing::warn!(source = %state.source.display(), error = %e, "reload failed");
        error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    })?;
    let fresh = registry::set_index(fresh);
    let docs = fresh.num_docs();
    *state.index.write() = fresh;
    tracing::info!(docs, "index reloaded");
    Ok(Json(serde_json::json!({ "reloaded": true, "docs": docs })))
}

fn authorize(state: &AppState, headers: &axum::http::HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(error(StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set")),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(error(StatusCode::UNAUTHORIZED, "invalid admin token"))
    }
}
