//! API response bodies

use serde::{Deserialize, Serialize};

use super::document::DocumentView;
use super::outcome::FailureSummary;

/// Body of a successful single-file upload
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub document_id: i64,
}

impl UploadResponse {
    pub fn success(document_id: i64) -> Self {
        Self {
            status: "success",
            document_id,
        }
    }
}

/// Body of a directory ingestion
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryResponse {
    pub status: &'static str,
    /// Number of files that produced a record
    pub processed_documents: usize,
    pub document_ids: Vec<i64>,
    pub failures: Vec<FailureSummary>,
}

/// All stored documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentView>,
    pub total_count: usize,
}
