//! Application state for the ingestion server

use std::sync::Arc;

use crate::config::DocaiConfig;
use crate::error::Result;
use crate::ingestion::Ingestor;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DocaiConfig,
    ingestor: Ingestor,
}

impl AppState {
    /// Build the pipeline described by `config`
    pub fn new(config: DocaiConfig) -> Result<Self> {
        tracing::info!("Initializing ingestion state...");

        let ingestor = Ingestor::from_config(&config)?;
        tracing::info!(
            "Pipeline ready (formats: {}, archive: {}, database: {})",
            ingestor.formats().extensions().join(", "),
            config.storage.archive_dir.display(),
            config.storage.database_path.display()
        );

        Ok(Self::from_parts(config, ingestor))
    }

    /// Wrap an already assembled pipeline
    pub fn from_parts(config: DocaiConfig, ingestor: Ingestor) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, ingestor }),
        }
    }

    pub fn config(&self) -> &DocaiConfig {
        &self.inner.config
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.inner.ingestor
    }
}
