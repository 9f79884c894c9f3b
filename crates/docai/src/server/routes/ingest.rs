//! Ingestion endpoints

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{DirectoryResponse, FileOutcome, UploadResponse};

fn default_enhance() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    #[serde(default = "default_enhance")]
    pub enhance_with_ai: bool,
}

#[derive(Debug, Deserialize)]
pub struct DirectoryParams {
    pub directory_path: String,
    #[serde(default = "default_enhance")]
    pub enhance_with_ai: bool,
}

/// POST /upload - Ingest the multipart field `file`
pub async fn upload_file(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        // Drop any client-side directories from the name
        let filename = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| Error::InvalidInput("upload has no filename".to_string()))?;

        // Reject before the body is read or staged
        let file_type = state.ingestor().formats().file_type_of(Path::new(&filename))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidInput(format!("Failed to read file: {}", e)))?;

        tracing::info!("Received upload: {} ({} bytes)", filename, data.len());

        let staged = tokio::task::spawn_blocking(move || -> Result<NamedTempFile> {
            let mut file = tempfile::Builder::new()
                .prefix("docai-upload-")
                .suffix(&format!(".{}", file_type.extension()))
                .tempfile()?;
            file.write_all(&data)?;
            file.flush()?;
            Ok(file)
        })
        .await??;

        let outcome = state
            .ingestor()
            .ingest_named(staged.path(), &filename, params.enhance_with_ai)
            .await?;

        return match outcome {
            FileOutcome::Ingested { id } => Ok(Json(UploadResponse::success(id))),
            FileOutcome::Failed { reason, .. } => Err(reason),
        };
    }

    Err(Error::InvalidInput(
        "multipart field 'file' is required".to_string(),
    ))
}

/// POST /process-directory - Ingest a directory on the server's filesystem
pub async fn process_directory(
    State(state): State<AppState>,
    Query(params): Query<DirectoryParams>,
) -> Result<Json<DirectoryResponse>> {
    let root = PathBuf::from(&params.directory_path);
    if !root.is_dir() {
        return Err(Error::InvalidInput(format!(
            "Directory not found: {}",
            params.directory_path
        )));
    }

    let report = state
        .ingestor()
        .ingest_directory_report(&root, params.enhance_with_ai)
        .await?;

    let document_ids = report.document_ids();
    Ok(Json(DirectoryResponse {
        status: "success",
        processed_documents: document_ids.len(),
        document_ids,
        failures: report.failures(),
    }))
}
