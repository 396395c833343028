//! Generate-content client (Gemini-style API, API-key header auth).

use crate::error::GenError;
use crate::providers::wire;
use crate::providers::FragmentStream;
use serde_json::Value;
use tokio_stream::StreamExt;
use tracing::debug;

pub struct GenerateContentClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GenerateContentClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    async fn request(&self, prompt: &str, stream: bool) -> Result<reqwest::Response, GenError> {
        let method = if stream {
            "streamGenerateContent?alt=sse"
        } else {
            "generateContent"
        };
        let url = format!("{}/v1beta/models/{}:{}", self.base_url, self.model, method);
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
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
        Ok(response)
    }

    /// Whole-response generation.
    pub async fn generate(&self, prompt: &str) -> Result<String, GenError> {
        let response = self.request(prompt, false).await?;
        let value: Value = response
            .json()
            .await
            .map_err(|e| GenError::ProviderUnreachable(e.to_string()))?;
        wire::content_parts(&value).ok_or_else(|| GenError::ProviderError {
            status: 200,
            body: format!("response without content parts: {}", value),
        })
    }

    /// Streamed generation: SSE `data:` events, each a generate-content
    /// chunk with the same candidate shape as the whole response.
    pub async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream, GenError> {
        let response = self.request(prompt, true).await?;
        let mut lines = wire::response_lines(response);
        let stream = async_stream::stream! {
            while let Some(line) = lines.next().await {
                match line {
                    Ok(line) => {
                        let Some(payload) = wire::sse_payload(&line) else {
                            continue;
                        };
                        let chunk: Option<String> = serde_json::from_str::<Value>(payload)
                            .ok()
                            .and_then(|v| wire::content_parts(&v));
                        match chunk {
                            Some(fragment) if !fragment.is_empty() => yield Ok(fragment),
                            Some(_) => {}
                            None => debug!("Skipping undecodable content event: {}", payload),
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
}
