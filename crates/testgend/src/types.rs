//! Request/response types shared by the HTTP surface and the generation flow.

use crate::error::GenError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One test-generation request as submitted by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Source code to generate tests for. Must be non-empty.
    pub code: String,
    /// Target language of the code (free text, e.g. "python").
    #[serde(default)]
    pub language: String,
    /// Test framework to target. Empty means "an appropriate framework".
    #[serde(default)]
    pub framework: String,
    /// Provider tag: "ollama", "openai", "gemini" or "openrouter".
    pub provider: String,
    /// API key, required for hosted providers.
    #[serde(default)]
    pub api_key: String,
    /// Model name. Hosted providers fall back to a configured default;
    /// the local runner requires the model to be loaded already.
    #[serde(default)]
    pub model: String,
    /// Free-text extra requirements folded into the prompt.
    #[serde(default)]
    pub requirements: String,
}

impl GenerateRequest {
    /// Request-level validation shared by both operating modes.
    pub fn validate(&self) -> Result<(), GenError> {
        if self.code.trim().is_empty() {
            return Err(GenError::InvalidRequest("no source code provided".into()));
        }
        Ok(())
    }
}

/// Closed set of supported provider backends. Unknown tags are rejected
/// here, at construction, not deep in the call path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    OpenAi,
    Gemini,
    OpenRouter,
}

impl ProviderKind {
    pub fn parse(tag: &str) -> Result<Self, GenError> {
        match tag {
            "ollama" => Ok(ProviderKind::Ollama),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            other => Err(GenError::InvalidRequest(format!(
                "unknown provider '{}'",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenRouter => "openrouter",
        }
    }
}

/// Persisted projection of one request plus its normalized result.
/// Immutable once written: the store only inserts and reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Opaque identifier assigned by the store at insert time.
    pub id: String,
    pub code: String,
    pub language: String,
    pub framework: String,
    pub provider: String,
    pub requirements: String,
    /// Fully normalized generated tests.
    pub tests: String,
    pub created_at: DateTime<Utc>,
}

/// Entry in the history listing: full record plus a short code preview,
/// newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: HistoryRecord,
    pub preview: String,
}

/// Successful synchronous generation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub tests: String,
}
