//! Sentira: a local-first clinical safety audit engine.
//!
//! Takes the extracted facts of one encounter plus the source documents
//! they were extracted from, runs a deterministic interaction matcher and
//! a grounded generative review concurrently, and merges both into a
//! single evidence-quoted risk report. Everything runs on the local
//! machine; the only network peer is a local Ollama instance.

pub mod config;
pub mod models;
pub mod kb;
pub mod reasoning;
pub mod engine;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for an embedding application.
/// Honors `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);
}
