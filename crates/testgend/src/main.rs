//! Testgen daemon - generates unit tests for submitted code via an LLM
//! provider and records completed generations.

use anyhow::Result;
use testgend::{config::Config, server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("testgend v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load();
    server::run(config).await
}
