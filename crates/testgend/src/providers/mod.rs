//! Provider adapters - a uniform generate contract over heterogeneous
//! text-generation backends.
//!
//! One closed enum covers the supported backends; the variant is chosen from
//! the request's provider tag at construction time and unknown tags are
//! rejected there. All configuration (candidate hosts, base URLs, default
//! models) arrives explicitly through [`Config`].

pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod wire;

use crate::config::Config;
use crate::error::GenError;
use crate::types::{GenerateRequest, ProviderKind};
use gemini::GenerateContentClient;
use ollama::OllamaClient;
use openai::ChatCompletionsClient;
use std::pin::Pin;
use tokio_stream::{Stream, StreamExt};

/// Ordered sequence of generated text fragments, yielded in arrival order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, GenError>> + Send>>;

pub enum ProviderClient {
    Ollama { client: OllamaClient, model: String },
    OpenAi(ChatCompletionsClient),
    Gemini(GenerateContentClient),
    OpenRouter(ChatCompletionsClient),
}

impl ProviderClient {
    /// Build the client named by the request. Hosted providers require an
    /// API key and fall back to their configured default model.
    pub fn from_request(req: &GenerateRequest, config: &Config) -> Result<Self, GenError> {
        let kind = ProviderKind::parse(&req.provider)?;

        if kind != ProviderKind::Ollama && req.api_key.trim().is_empty() {
            return Err(GenError::InvalidRequest(format!(
                "provider '{}' requires an API key",
                kind.as_str()
            )));
        }

        let model = |fallback: &str| {
            if req.model.trim().is_empty() {
                fallback.to_string()
            } else {
                req.model.clone()
            }
        };

        Ok(match kind {
            ProviderKind::Ollama => ProviderClient::Ollama {
                client: OllamaClient::new(config.ollama.clone()),
                model: req.model.clone(),
            },
            ProviderKind::OpenAi => ProviderClient::OpenAi(ChatCompletionsClient::new(
                &config.providers.openai_base_url,
                &req.api_key,
                &model(&config.providers.openai_default_model),
            )),
            ProviderKind::Gemini => ProviderClient::Gemini(GenerateContentClient::new(
                &config.providers.gemini_base_url,
                &req.api_key,
                &model(&config.providers.gemini_default_model),
            )),
            ProviderKind::OpenRouter => ProviderClient::OpenRouter(ChatCompletionsClient::new(
                &config.providers.openrouter_base_url,
                &req.api_key,
                &model(&config.providers.openrouter_default_model),
            )),
        })
    }

    /// Whole-response generation. The local runner only streams, so its
    /// fragments are drained here.
    pub async fn generate(&self, prompt: &str) -> Result<String, GenError> {
        match self {
            ProviderClient::Ollama { client, model } => {
                let mut fragments = client.generate_stream(model, prompt).await?;
                let mut out = String::new();
                while let Some(fragment) = fragments.next().await {
                    out.push_str(&fragment?);
                }
                Ok(out)
            }
            ProviderClient::OpenAi(client) | ProviderClient::OpenRouter(client) => {
                client.generate(prompt).await
            }
            ProviderClient::Gemini(client) => client.generate(prompt).await,
        }
    }

    /// Streamed generation: fragments in arrival order, never reordered or
    /// buffered beyond one decodable unit.
    pub async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream, GenError> {
        match self {
            ProviderClient::Ollama { client, model } => {
                client.generate_stream(model, prompt).await
            }
            ProviderClient::OpenAi(client) | ProviderClient::OpenRouter(client) => {
                client.generate_stream(prompt).await
            }
            ProviderClient::Gemini(client) => client.generate_stream(prompt).await,
        }
    }
}

/// Build the single prompt string sent to every backend.
pub fn build_prompt(req: &GenerateRequest) -> String {
    let framework = if req.framework.trim().is_empty() {
        "an appropriate framework"
    } else {
        req.framework.as_str()
    };
    format!(
        "Write unit tests for the following {} code using {}:\n\n{}\n\nRequirements: {}\n\nReturn ONLY the unit test code, no explanations.",
        req.language, framework, req.code, req.requirements
    )
}
