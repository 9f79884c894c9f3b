//! Ingestion server binary
//!
//! Run with: cargo run -p docai --bin docai-server
//! Set DOCAI_CONFIG to load settings from a TOML file.

use docai::{config::DocaiConfig, server::DocaiServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docai=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::var_os("DOCAI_CONFIG").map(PathBuf::from);
    let config = DocaiConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Formats: {}", config.ingestion.supported_formats.join(", "));
    tracing::info!("  - Archive: {}", config.storage.archive_dir.display());
    tracing::info!("  - Database: {}", config.storage.database_path.display());
    tracing::info!("  - LLM: {:?} {} at {}", config.llm.provider, config.llm.model, config.llm.base_url);
    tracing::info!("  - On enhancement failure: {:?}", config.ingestion.on_enhancement_failure);

    let llm_url = config.llm.base_url.clone();
    let server = DocaiServer::new(config)?;

    // Enhancement failures are handled per file, so an unreachable backend only warns
    if server.check_llm().await {
        tracing::info!("LLM backend is reachable at {}", llm_url);
    } else {
        tracing::warn!("LLM backend not available at {}", llm_url);
        tracing::warn!("Uploads with enhance_with_ai=true will fall back or fail per policy");
    }

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  Info: http://{}/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /upload             - Upload one document");
    println!("  POST /process-directory  - Ingest a server-side directory");
    println!("  GET  /documents          - List documents");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
