//! Ingestion orchestrator
//!
//! Coordinates one file through archive, extraction, optional enhancement and
//! persistence, and fans out over directory trees. This is the only place
//! that decides what a per-file failure means for the caller.

use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::config::{DocaiConfig, EnhancementFailurePolicy};
use crate::error::{Error, Result};
use crate::generation::Enhancer;
use crate::providers::build_llm_provider;
use crate::storage::{ArchiveStore, DocumentRepository, SqliteDocumentRepository};
use crate::types::{
    DocumentRecord, FileOutcome, FileStage, IngestReport, NewDocument, SupportedFormats,
};

use super::extractor::TextExtractor;

/// Runs the ingestion pipeline
pub struct Ingestor {
    extractor: Arc<TextExtractor>,
    enhancer: Arc<Enhancer>,
    repository: Arc<dyn DocumentRepository>,
    archive: Arc<ArchiveStore>,
    on_enhancement_failure: EnhancementFailurePolicy,
    parallel_files: usize,
}

impl Ingestor {
    pub fn new(
        extractor: Arc<TextExtractor>,
        enhancer: Arc<Enhancer>,
        repository: Arc<dyn DocumentRepository>,
        archive: Arc<ArchiveStore>,
    ) -> Self {
        Self {
            extractor,
            enhancer,
            repository,
            archive,
            on_enhancement_failure: EnhancementFailurePolicy::default(),
            parallel_files: 1,
        }
    }

    /// Wire up the full pipeline from configuration
    pub fn from_config(config: &DocaiConfig) -> Result<Self> {
        let extractor = Arc::new(TextExtractor::from_config(config)?);
        let provider = build_llm_provider(&config.llm)?;
        let enhancer = Arc::new(Enhancer::new(provider, &config.llm));
        let repository = Arc::new(SqliteDocumentRepository::new(&config.storage.database_path)?);
        let archive = Arc::new(ArchiveStore::new(&config.storage.archive_dir)?);

        Ok(Self::new(extractor, enhancer, repository, archive)
            .with_failure_policy(config.ingestion.on_enhancement_failure)
            .with_parallel_files(config.ingestion.parallel_files))
    }

    pub fn with_failure_policy(mut self, policy: EnhancementFailurePolicy) -> Self {
        self.on_enhancement_failure = policy;
        self
    }

    pub fn with_parallel_files(mut self, parallel_files: usize) -> Self {
        self.parallel_files = parallel_files.max(1);
        self
    }

    pub fn formats(&self) -> &SupportedFormats {
        self.extractor.formats()
    }

    pub fn extractor(&self) -> &TextExtractor {
        &self.extractor
    }

    pub fn enhancer(&self) -> &Enhancer {
        &self.enhancer
    }

    /// Ingest one file; `Ok(None)` means it failed and the failure was logged
    pub async fn ingest_file(&self, path: &Path, enhance: bool) -> Result<Option<i64>> {
        Ok(self.ingest_file_outcome(path, enhance).await?.document_id())
    }

    /// Ingest one file and report how it went
    pub async fn ingest_file_outcome(&self, path: &Path, enhance: bool) -> Result<FileOutcome> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.ingest_named(path, &name, enhance).await
    }

    /// Ingest `path` but record it under `filename`.
    ///
    /// Uploads are staged in temp files; the record and the archive copy carry
    /// the name the client sent instead.
    pub async fn ingest_named(&self, path: &Path, filename: &str, enhance: bool) -> Result<FileOutcome> {
        if !path.is_file() {
            return Err(Error::NotFound(path.display().to_string()));
        }

        let outcome = self.run_pipeline(path, filename, enhance).await;
        match &outcome {
            FileOutcome::Ingested { id } => {
                tracing::info!("[{}] ingested as document {}", filename, id);
            }
            FileOutcome::Failed { stage, reason } => {
                tracing::error!("[{}] failed at {} stage: {}", filename, stage, reason);
            }
        }
        Ok(outcome)
    }

    async fn run_pipeline(&self, path: &Path, filename: &str, enhance: bool) -> FileOutcome {
        let file_type = match self.formats().file_type_of(Path::new(filename)) {
            Ok(file_type) => file_type,
            Err(e) => return FileOutcome::failed(FileStage::Validation, e),
        };

        let archived = {
            let archive = Arc::clone(&self.archive);
            let source = path.to_path_buf();
            let name = filename.to_string();
            tokio::task::spawn_blocking(move || archive.archive(&source, &name)).await
        };
        let storage_path = match archived.map_err(Error::from).and_then(|r| r) {
            Ok(p) => p,
            Err(e) => return FileOutcome::failed(FileStage::Archive, e),
        };

        // Extract from the archived copy so the staged source may vanish early
        let extracted = {
            let extractor = Arc::clone(&self.extractor);
            let target = storage_path.clone();
            tokio::task::spawn_blocking(move || extractor.extract_text(&target)).await
        };
        let raw_text = match extracted.map_err(Error::from).and_then(|r| r) {
            Ok(text) => text,
            Err(e) => return FileOutcome::failed(FileStage::Extraction, e),
        };

        let content = if enhance && !raw_text.trim().is_empty() {
            match self.enhancer.enhance(&raw_text, file_type.extension()).await {
                Ok(text) => text,
                Err(e) => match self.on_enhancement_failure {
                    EnhancementFailurePolicy::FallbackToRaw => {
                        tracing::warn!("[{}] enhancement failed, keeping raw text: {}", filename, e);
                        raw_text
                    }
                    EnhancementFailurePolicy::SkipFile => {
                        return FileOutcome::failed(FileStage::Enhancement, e)
                    }
                },
            }
        } else {
            raw_text
        };

        let document = NewDocument {
            filename: filename.to_string(),
            file_type: file_type.extension().to_string(),
            content,
            storage_path: storage_path.display().to_string(),
        };

        let created = {
            let repository = Arc::clone(&self.repository);
            tokio::task::spawn_blocking(move || repository.create(document)).await
        };
        match created.map_err(Error::from).and_then(|r| r) {
            Ok(record) => FileOutcome::Ingested { id: record.id },
            Err(e) => FileOutcome::failed(FileStage::Persistence, e),
        }
    }

    /// Ingest every supported file under `root`, returning the ids of successes
    pub async fn ingest_directory(&self, root: &Path, enhance: bool) -> Result<Vec<i64>> {
        let report = self.ingest_directory_report(root, enhance).await?;
        Ok(report.document_ids())
    }

    /// Ingest every supported file under `root` and report per-file outcomes
    pub async fn ingest_directory_report(&self, root: &Path, enhance: bool) -> Result<IngestReport> {
        if !root.is_dir() {
            return Err(Error::NotFound(root.display().to_string()));
        }

        let files = self.collect_files(root);
        tracing::info!(
            "Ingesting {} files from {} ({} at a time)",
            files.len(),
            root.display(),
            self.parallel_files
        );

        // `buffered` keeps results in enumeration order
        let outcomes: Vec<(PathBuf, FileOutcome)> = stream::iter(files)
            .map(|path| async move {
                let outcome = match self.ingest_file_outcome(&path, enhance).await {
                    Ok(outcome) => outcome,
                    Err(e) => FileOutcome::failed(FileStage::Validation, e),
                };
                (path, outcome)
            })
            .buffered(self.parallel_files)
            .collect()
            .await;

        let mut report = IngestReport::default();
        for (path, outcome) in outcomes {
            report.push(path, outcome);
        }

        tracing::info!(
            "Directory {} done: {} ingested, {} failed",
            root.display(),
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }

    fn collect_files(&self, root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| self.formats().is_supported(path))
            .collect()
    }

    /// Run enhancement again over a stored record
    pub async fn reenhance(&self, id: i64) -> Result<Option<DocumentRecord>> {
        let Some(record) = self.get_document(id).await? else {
            return Ok(None);
        };

        let content = record.content.clone().unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Some(record));
        }

        let enhanced = self.enhancer.enhance(&content, &record.file_type).await?;

        let repository = Arc::clone(&self.repository);
        tokio::task::spawn_blocking(move || repository.update_content(id, &enhanced)).await?
    }

    pub async fn get_document(&self, id: i64) -> Result<Option<DocumentRecord>> {
        let repository = Arc::clone(&self.repository);
        tokio::task::spawn_blocking(move || repository.get_by_id(id)).await?
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        let repository = Arc::clone(&self.repository);
        tokio::task::spawn_blocking(move || repository.list()).await?
    }
}
