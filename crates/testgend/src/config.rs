//! Daemon configuration.
//!
//! Configuration lives in a single TOML file. Every field has a default so a
//! missing or partial file still yields a working daemon. Provider base URLs
//! are explicit configuration handed to the provider clients at construction;
//! there is no process-global endpoint state, and tests point the clients at
//! in-process fake servers through these fields.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CONFIG_FILE: &str = "testgend.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub providers: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Path of the SQLite history database.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Candidate base URLs for the local runner, probed in order.
    #[serde(default = "default_ollama_hosts")]
    pub hosts: Vec<String>,

    /// Per-host health probe timeout (seconds).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_openai_model")]
    pub openai_default_model: String,

    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_gemini_model")]
    pub gemini_default_model: String,

    #[serde(default = "default_openrouter_base_url")]
    pub openrouter_base_url: String,
    #[serde(default = "default_openrouter_model")]
    pub openrouter_default_model: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:7870".to_string()
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("testgend")
        .join("history.db")
}

fn default_ollama_hosts() -> Vec<String> {
    vec![
        "http://127.0.0.1:11434".to_string(),
        "http://localhost:11434".to_string(),
    ]
}

fn default_probe_timeout() -> u64 {
    3
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_openrouter_base_url() -> String {
    "https://openrouter.ai/api".to_string()
}

fn default_openrouter_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            hosts: default_ollama_hosts(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            openai_base_url: default_openai_base_url(),
            openai_default_model: default_openai_model(),
            gemini_base_url: default_gemini_base_url(),
            gemini_default_model: default_gemini_model(),
            openrouter_base_url: default_openrouter_base_url(),
            openrouter_default_model: default_openrouter_model(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to
    /// defaults when the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        let path = Self::default_path();
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => match toml::from_str::<Config>(&raw) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!("Invalid config {:?}: {} - using defaults", path, e);
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("TESTGEND_CONFIG") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("testgend")
            .join(CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert!(!config.ollama.hosts.is_empty());
        assert_eq!(config.ollama.probe_timeout_secs, 3);
        assert_eq!(config.providers.openai_default_model, "gpt-4o-mini");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testgend.toml");
        fs::write(&path, "[server]\nbind_addr = \"0.0.0.0:9999\"\n").unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.server.bind_addr, "0.0.0.0:9999");
        assert_eq!(config.ollama.probe_timeout_secs, 3);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/testgend.toml"));
        assert_eq!(config.server.bind_addr, default_bind_addr());
    }
}
