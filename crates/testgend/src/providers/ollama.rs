//! Local model runner (Ollama-style HTTP API).
//!
//! The runner may listen on any of a small set of candidate hosts; each is
//! health-probed in order with a short timeout and the first responder wins.
//! Generation is always streamed: the runner emits one JSON object per line
//! with the fragment in its `response` field.

use crate::config::OllamaConfig;
use crate::error::GenError;
use crate::providers::wire::{self, LineStream};
use crate::providers::FragmentStream;
use serde_json::Value;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::{debug, info};

pub struct OllamaClient {
    http: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// First candidate host that answers the tags probe within the timeout.
    async fn discover(&self) -> Result<String, GenError> {
        let timeout = Duration::from_secs(self.config.probe_timeout_secs);
        for host in &self.config.hosts {
            let probe = self
                .http
                .get(format!("{}/api/tags", host))
                .timeout(timeout)
                .send()
                .await;
            match probe {
                Ok(r) if r.status().is_success() => {
                    debug!("Local runner found at {}", host);
                    return Ok(host.clone());
                }
                Ok(r) => debug!("Probe of {} answered {}", host, r.status()),
                Err(e) => debug!("Probe of {} failed: {}", host, e),
            }
        }
        Err(GenError::ProviderUnreachable(format!(
            "no local runner answered on {:?}",
            self.config.hosts
        )))
    }

    /// Names of the models currently loaded on the runner.
    pub async fn list_models(&self) -> Result<Vec<String>, GenError> {
        let host = self.discover().await?;
        self.list_models_at(&host).await
    }

    /// Listing variant for the models endpoint: an unreachable runner is an
    /// empty list, not an error.
    pub async fn list_models_or_empty(&self) -> Vec<String> {
        match self.list_models().await {
            Ok(models) => models,
            Err(e) => {
                info!("Model listing unavailable: {}", e);
                Vec::new()
            }
        }
    }

    async fn list_models_at(&self, host: &str) -> Result<Vec<String>, GenError> {
        let response = self
            .http
            .get(format!("{}/api/tags", host))
            .send()
            .await
            .map_err(|e| GenError::ProviderUnreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(GenError::ProviderError {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        let value: Value = response
            .json()
            .await
            .map_err(|e| GenError::ProviderUnreachable(e.to_string()))?;
        let models = value
            .get("models")
            .and_then(|m| m.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
                    .map(|n| n.to_string())
                    .collect()
            })
            .unwrap_or_default();
        Ok(models)
    }

    /// Stream generated fragments for a prompt. Fails with ModelNotAvailable
    /// before any generation starts when the named model is not loaded.
    pub async fn generate_stream(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<FragmentStream, GenError> {
        let host = self.discover().await?;

        let available = self.list_models_at(&host).await?;
        if !available.iter().any(|m| m == model) {
            return Err(GenError::ModelNotAvailable(model.to_string()));
        }

        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": true,
        });
        let response = self
            .http
            .post(format!("{}/api/generate", host))
            .json(&body)
            .send()
            .await
            .map_err(|e| GenError::ProviderUnreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(GenError::ProviderError {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let mut lines = wire::response_lines(response);
        let stream = async_stream::stream! {
            while let Some(line) = lines.next().await {
                match line {
                    Ok(line) => {
                        if line.is_empty() {
                            continue;
                        }
                        match wire::generate_fragment(&line) {
                            Some(fragment) if !fragment.is_empty() => yield Ok(fragment),
                            Some(_) => {}
                            None => debug!("Skipping undecodable runner line: {}", line),
                        }
                        if wire::generate_done(&line) {
                            break;
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }

    /// Relay the runner's model download progress, one raw JSON line per
    /// event, exactly as the runner reports it.
    pub async fn pull_stream(&self, model: &str) -> Result<LineStream, GenError> {
        let host = self.discover().await?;

        let body = serde_json::json!({ "name": model });
        let response = self
            .http
            .post(format!("{}/api/pull", host))
            .json(&body)
            .send()
            .await
            .map_err(|e| GenError::ProviderUnreachable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(GenError::ProviderError {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(wire::response_lines(response))
    }
}
