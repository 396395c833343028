//! API routes for testgend.

use crate::generation;
use crate::providers::ollama::OllamaClient;
use crate::server::AppState;
use crate::types::{GenerateRequest, GenerateResponse, HistoryEntry};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::{Stream, StreamExt};
use tracing::info;

type AppStateArc = Arc<AppState>;

const CODE_PREVIEW_CHARS: usize = 40;

pub fn routes() -> Router<AppStateArc> {
    Router::new()
        .route("/", get(index))
        .route("/v1/generate", post(generate))
        .route("/v1/generate/stream", post(generate_stream))
        .route("/v1/models", get(list_models))
        .route("/v1/models/pull", get(pull_model))
        .route("/v1/history", get(history_list))
        .route("/v1/history/:id", get(history_get))
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../assets/index.html"))
}

// ============================================================================
// Generation
// ============================================================================

async fn generate(
    State(state): State<AppStateArc>,
    Json(req): Json<GenerateRequest>,
) -> Response {
    info!("Generate ({}, {})", req.provider, req.language);
    match generation::run_sync(&req, &state.config, &state.store).await {
        Ok(tests) => Json(GenerateResponse { tests }).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn generate_stream(
    State(state): State<AppStateArc>,
    Json(req): Json<GenerateRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("Generate stream ({}, {})", req.provider, req.language);
    let stream = generation::run_stream(req, state.config.clone(), state.store.clone())
        .map(|data| Ok(sse_event(data)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// One SSE event per payload. Embedded newlines become multiple `data:`
/// fields within the event; carriage returns (possible inside a forwarded
/// provider error body) would break the frame encoding and are stripped.
fn sse_event(data: String) -> Event {
    Event::default().data(data.replace('\r', ""))
}

// ============================================================================
// Local runner models
// ============================================================================

async fn list_models(State(state): State<AppStateArc>) -> Json<Vec<String>> {
    let client = OllamaClient::new(state.config.ollama.clone());
    Json(client.list_models_or_empty().await)
}

#[derive(Debug, Deserialize)]
struct PullParams {
    model: String,
}

/// Relay the runner's pull progress verbatim, one event per progress line.
async fn pull_model(
    State(state): State<AppStateArc>,
    Query(params): Query<PullParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("Pulling model '{}'", params.model);
    let config = state.config.ollama.clone();
    let stream = async_stream::stream! {
        let client = OllamaClient::new(config);
        match client.pull_stream(&params.model).await {
            Ok(mut lines) => {
                while let Some(line) = lines.next().await {
                    match line {
                        Ok(line) if !line.is_empty() => yield line,
                        Ok(_) => {}
                        Err(e) => {
                            yield format!("Error: {}", e);
                            break;
                        }
                    }
                }
            }
            Err(e) => yield format!("Error: {}", e),
        }
    }
    .map(|data| Ok(sse_event(data)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ============================================================================
// History
// ============================================================================

async fn history_list(State(state): State<AppStateArc>) -> Response {
    match state.store.list() {
        Ok(records) => {
            let entries: Vec<HistoryEntry> = records
                .into_iter()
                .map(|record| {
                    let preview = preview_of(&record.code);
                    HistoryEntry { record, preview }
                })
                .collect();
            Json(entries).into_response()
        }
        Err(e) => e.into_response(),
    }
}

async fn history_get(State(state): State<AppStateArc>, Path(id): Path<String>) -> Response {
    match state.store.get(&id) {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Not found" })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

fn preview_of(code: &str) -> String {
    if code.chars().count() <= CODE_PREVIEW_CHARS {
        code.to_string()
    } else {
        let head: String = code.chars().take(CODE_PREVIEW_CHARS).collect();
        format!("{}...", head)
    }
}
