//! Testgen daemon library - exposes modules for testing.

pub mod config;
pub mod error;
pub mod generation;
pub mod history;
pub mod normalizer;
pub mod providers;
pub mod routes;
pub mod server;
pub mod types;
