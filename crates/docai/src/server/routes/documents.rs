//! Document endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{DocumentListResponse, DocumentView};

/// GET /documents - List all documents
pub async fn list_documents(State(state): State<AppState>) -> Result<Json<DocumentListResponse>> {
    let documents: Vec<DocumentView> = state
        .ingestor()
        .list_documents()
        .await?
        .into_iter()
        .map(DocumentView::from)
        .collect();

    let total_count = documents.len();
    Ok(Json(DocumentListResponse {
        documents,
        total_count,
    }))
}

/// GET /document/:id - Get a specific document
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DocumentView>> {
    let record = state
        .ingestor()
        .get_document(id)
        .await?
        .ok_or(Error::DocumentNotFound(id))?;

    Ok(Json(DocumentView::from(record)))
}

/// POST /document/:id/enhance - Enhance the stored text again
pub async fn enhance_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DocumentView>> {
    let record = state
        .ingestor()
        .reenhance(id)
        .await?
        .ok_or(Error::DocumentNotFound(id))?;

    tracing::info!("Re-enhanced document {} ({})", id, record.filename);
    Ok(Json(DocumentView::from(record)))
}
