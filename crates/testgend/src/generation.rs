//! Generation flows - the two operating modes over the provider adapters.
//!
//! Synchronous mode collects every fragment, normalizes once and returns the
//! cleaned text. Streaming mode relays each fragment as it arrives
//! (normalized in isolation so the client always sees displayable text) and
//! normalizes the accumulated raw output once at the end for the history
//! record. Both modes append exactly one history record on success; no
//! record is written for failed or abandoned generations.
//!
//! Backpressure is implicit: each fragment is fully processed and emitted
//! before the next is requested. The streaming flow runs inside the returned
//! stream itself, so dropping it (client disconnect) abandons the in-flight
//! provider read and skips persistence.

use crate::config::Config;
use crate::error::GenError;
use crate::history::HistoryStore;
use crate::normalizer::normalize;
use crate::providers::{build_prompt, ProviderClient};
use crate::types::{GenerateRequest, HistoryRecord};
use chrono::Utc;
use std::sync::Arc;
use tokio_stream::{Stream, StreamExt};
use tracing::{error, info};

/// Sentinel emitted as the sole stream event when the local runner does not
/// have the requested model, so the client can offer to pull it.
pub const MISSING_MODEL_SENTINEL: &str = "__MISSING_MODEL__";

fn record_for(req: &GenerateRequest, tests: &str) -> HistoryRecord {
    HistoryRecord {
        id: String::new(), // assigned by the store
        code: req.code.clone(),
        language: req.language.clone(),
        framework: req.framework.clone(),
        provider: req.provider.clone(),
        requirements: req.requirements.clone(),
        tests: tests.to_string(),
        created_at: Utc::now(),
    }
}

/// Synchronous mode: whole response in, cleaned text out, one history row.
pub async fn run_sync(
    req: &GenerateRequest,
    config: &Config,
    store: &HistoryStore,
) -> Result<String, GenError> {
    req.validate()?;
    let client = ProviderClient::from_request(req, config)?;
    let prompt = build_prompt(req);

    let raw = client.generate(&prompt).await?;
    let tests = normalize(&raw);

    let id = store.append(&record_for(req, &tests))?;
    info!("Generation complete via {} (history {})", req.provider, id);
    Ok(tests)
}

/// Streaming mode: one data payload per fragment, normalized in isolation,
/// relayed in arrival order. Failures are delivered as a final in-stream
/// event rather than an out-of-band status.
pub fn run_stream(
    req: GenerateRequest,
    config: Config,
    store: Arc<HistoryStore>,
) -> impl Stream<Item = String> + Send {
    async_stream::stream! {
        if let Err(e) = req.validate() {
            yield format!("Error: {}", e);
            return;
        }
        let client = match ProviderClient::from_request(&req, &config) {
            Ok(client) => client,
            Err(e) => {
                yield format!("Error: {}", e);
                return;
            }
        };
        let prompt = build_prompt(&req);

        let mut fragments = match client.generate_stream(&prompt).await {
            Ok(fragments) => fragments,
            Err(GenError::ModelNotAvailable(model)) => {
                info!("Requested model '{}' not loaded on the local runner", model);
                yield format!("{}{}", MISSING_MODEL_SENTINEL, model);
                return;
            }
            Err(e) => {
                error!("Stream setup failed: {}", e);
                yield format!("Error: {}", e);
                return;
            }
        };

        let mut raw = String::new();
        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(fragment) => {
                    raw.push_str(&fragment);
                    // Per-chunk normalization keeps the relayed text clean
                    // even before the response is complete.
                    let cleaned = normalize(&fragment);
                    if !cleaned.is_empty() {
                        yield cleaned;
                    }
                }
                Err(e) => {
                    error!("Stream aborted: {}", e);
                    yield format!("Error: {}", e);
                    return;
                }
            }
        }

        // Reached only when the provider stream completed and the client is
        // still connected: the one place streaming mode persists.
        let tests = normalize(&raw);
        match store.append(&record_for(&req, &tests)) {
            Ok(id) => info!("Streamed generation complete via {} (history {})", req.provider, id),
            Err(e) => {
                error!("History append failed: {}", e);
                yield format!("Error: {}", e);
            }
        }
    }
}
