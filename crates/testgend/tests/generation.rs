//! End-to-end generation flows against in-process fake providers.
//!
//! Each fake is a plain axum router bound to an ephemeral port, speaking
//! just enough of the real wire protocol for the client under test.

use axum::{
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use testgend::config::Config;
use testgend::error::GenError;
use testgend::generation::{self, MISSING_MODEL_SENTINEL};
use testgend::history::HistoryStore;
use testgend::providers::ollama::OllamaClient;
use testgend::providers::ProviderClient;
use testgend::types::GenerateRequest;
use tokio_stream::StreamExt;

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Local runner with a single loaded model and a two-fragment generation.
fn fake_runner() -> Router {
    Router::new()
        .route(
            "/api/tags",
            get(|| async { Json(serde_json::json!({ "models": [{ "name": "llama3.1" }] })) }),
        )
        .route(
            "/api/generate",
            post(|| async {
                concat!(
                    "{\"response\": \"def test_\", \"done\": false}\n",
                    "not even json\n",
                    "{\"response\": \"a(): assert True\", \"done\": false}\n",
                    "{\"response\": \"\", \"done\": true}\n",
                )
            }),
        )
        .route(
            "/api/pull",
            post(|| async {
                "{\"status\": \"pulling manifest\"}\n{\"status\": \"success\"}\n"
            }),
        )
}

/// Hosted chat-completions provider answering with a fenced single-line test.
fn fake_chat_provider() -> Router {
    Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            Json(serde_json::json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "```def test_a(): assert True```"
                    }
                }]
            }))
        }),
    )
}

fn fake_chat_provider_streaming() -> Router {
    Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            concat!(
                "data: {\"choices\":[{\"delta\":{\"content\":\"def test_\"}}]}\n\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"a(): assert True\"}}]}\n\n",
                "data: [DONE]\n\n",
            )
        }),
    )
}

fn runner_config(base: &str) -> Config {
    let mut config = Config::default();
    config.ollama.hosts = vec![base.to_string()];
    config.ollama.probe_timeout_secs = 2;
    config
}

fn request(provider: &str, model: &str) -> GenerateRequest {
    GenerateRequest {
        code: "def add(a, b):\n    return a + b".into(),
        language: "python".into(),
        framework: "pytest".into(),
        provider: provider.into(),
        api_key: if provider == "ollama" { String::new() } else { "test-key".into() },
        model: model.into(),
        requirements: String::new(),
    }
}

#[tokio::test]
async fn missing_local_model_is_distinct_and_writes_nothing() {
    let base = spawn(fake_runner()).await;
    let config = runner_config(&base);
    let store = HistoryStore::open_in_memory().unwrap();

    let result = generation::run_sync(&request("ollama", "mistral"), &config, &store).await;
    match result {
        Err(GenError::ModelNotAvailable(model)) => assert_eq!(model, "mistral"),
        other => panic!("expected ModelNotAvailable, got {:?}", other.map(|_| ())),
    }
    assert_eq!(store.count().unwrap(), 0);
}

#[tokio::test]
async fn missing_local_model_stream_emits_sentinel_only() {
    let base = spawn(fake_runner()).await;
    let config = runner_config(&base);
    let store = Arc::new(HistoryStore::open_in_memory().unwrap());

    let stream = generation::run_stream(request("ollama", "mistral"), config, store.clone());
    let events: Vec<String> = stream.collect().await;

    assert_eq!(events, vec![format!("{}mistral", MISSING_MODEL_SENTINEL)]);
    assert_eq!(store.count().unwrap(), 0);
}

#[tokio::test]
async fn hosted_sync_generation_normalizes_and_persists_once() {
    let base = spawn(fake_chat_provider()).await;
    let mut config = Config::default();
    config.providers.openai_base_url = base;
    let store = HistoryStore::open_in_memory().unwrap();

    let tests = generation::run_sync(&request("openai", ""), &config, &store)
        .await
        .unwrap();

    assert_eq!(tests, "def test_a():\n    assert True");
    assert_eq!(store.count().unwrap(), 1);

    let record = &store.list().unwrap()[0];
    assert_eq!(record.tests, tests);
    assert_eq!(record.provider, "openai");
    assert_eq!(record.code, "def add(a, b):\n    return a + b");
}

#[tokio::test]
async fn local_sync_generation_drains_the_stream() {
    let base = spawn(fake_runner()).await;
    let config = runner_config(&base);
    let store = HistoryStore::open_in_memory().unwrap();

    let tests = generation::run_sync(&request("ollama", "llama3.1"), &config, &store)
        .await
        .unwrap();

    assert_eq!(tests, "def test_a():\n    assert True");
    assert_eq!(store.count().unwrap(), 1);
}

#[tokio::test]
async fn local_stream_relays_fragments_in_order_and_persists() {
    let base = spawn(fake_runner()).await;
    let config = runner_config(&base);
    let store = Arc::new(HistoryStore::open_in_memory().unwrap());

    let stream = generation::run_stream(request("ollama", "llama3.1"), config, store.clone());
    let events: Vec<String> = stream.collect().await;

    assert!(!events.is_empty());
    assert!(events[0].starts_with("def test_"));

    // Whitespace-collapsed, the streamed events match the single-shot result.
    let streamed: String = events.join("").split_whitespace().collect();
    let single_shot: String = "def test_a():\n    assert True".split_whitespace().collect();
    assert_eq!(streamed, single_shot);

    assert_eq!(store.count().unwrap(), 1);
    let record = &store.list().unwrap()[0];
    assert_eq!(record.tests, "def test_a():\n    assert True");
}

#[tokio::test]
async fn client_disconnect_mid_stream_persists_nothing() {
    let base = spawn(fake_runner()).await;
    let config = runner_config(&base);
    let store = Arc::new(HistoryStore::open_in_memory().unwrap());

    let mut stream = Box::pin(generation::run_stream(
        request("ollama", "llama3.1"),
        config,
        store.clone(),
    ));
    let first = stream.next().await;
    assert!(first.is_some());
    drop(stream);

    assert_eq!(store.count().unwrap(), 0);
}

#[tokio::test]
async fn hosted_streaming_yields_fragments_in_arrival_order() {
    let base = spawn(fake_chat_provider_streaming()).await;
    let mut config = Config::default();
    config.providers.openai_base_url = base;

    let client = ProviderClient::from_request(&request("openai", ""), &config).unwrap();
    let mut fragments = client.generate_stream("prompt").await.unwrap();

    let mut collected = Vec::new();
    while let Some(fragment) = fragments.next().await {
        collected.push(fragment.unwrap());
    }
    assert_eq!(collected, vec!["def test_", "a(): assert True"]);
}

#[tokio::test]
async fn provider_http_error_carries_status_and_body() {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            (
                axum::http::StatusCode::TOO_MANY_REQUESTS,
                "rate limited".to_string(),
            )
        }),
    );
    let base = spawn(app).await;
    let mut config = Config::default();
    config.providers.openai_base_url = base;
    let store = HistoryStore::open_in_memory().unwrap();

    let result = generation::run_sync(&request("openai", ""), &config, &store).await;
    match result {
        Err(GenError::ProviderError { status, body }) => {
            assert_eq!(status, 429);
            assert_eq!(body, "rate limited");
        }
        other => panic!("expected ProviderError, got {:?}", other.map(|_| ())),
    }
    assert_eq!(store.count().unwrap(), 0);
}

#[tokio::test]
async fn unreachable_runner_lists_no_models() {
    let mut config = Config::default();
    config.ollama.hosts = vec!["http://127.0.0.1:1".to_string()];
    config.ollama.probe_timeout_secs = 1;

    let client = OllamaClient::new(config.ollama);
    assert!(client.list_models_or_empty().await.is_empty());
}

#[tokio::test]
async fn loaded_models_are_listed() {
    let base = spawn(fake_runner()).await;
    let client = OllamaClient::new(runner_config(&base).ollama);
    assert_eq!(client.list_models_or_empty().await, vec!["llama3.1"]);
}

#[tokio::test]
async fn pull_progress_lines_are_relayed_verbatim() {
    let base = spawn(fake_runner()).await;
    let client = OllamaClient::new(runner_config(&base).ollama);

    let mut lines = client.pull_stream("llama3.1").await.unwrap();
    let mut collected = Vec::new();
    while let Some(line) = lines.next().await {
        collected.push(line.unwrap());
    }
    assert_eq!(
        collected,
        vec![
            "{\"status\": \"pulling manifest\"}",
            "{\"status\": \"success\"}",
        ]
    );
}

#[tokio::test]
async fn empty_code_fails_before_any_provider_call() {
    let config = Config::default();
    let store = HistoryStore::open_in_memory().unwrap();
    let mut req = request("ollama", "llama3.1");
    req.code = String::new();

    let result = generation::run_sync(&req, &config, &store).await;
    assert!(matches!(result, Err(GenError::InvalidRequest(_))));
    assert_eq!(store.count().unwrap(), 0);
}
