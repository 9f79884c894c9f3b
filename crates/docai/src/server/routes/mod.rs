//! API routes for the ingestion server

pub mod documents;
pub mod ingest;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Documents
        .route("/documents", get(documents::list_documents))
        .route("/document/:id", get(documents::get_document))
        .route("/document/:id/enhance", post(documents::enhance_document))
        // Ingestion - uploads get the configured body limit
        .route(
            "/upload",
            post(ingest::upload_file).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/process-directory", post(ingest::process_directory))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let extractor = state.ingestor().extractor();
    let provider = state.ingestor().enhancer().provider();
    let reachable = provider.health_check().await;

    Json(serde_json::json!({
        "name": "docai",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document ingestion with text extraction, OCR fallback and LLM enhancement",
        "supported_formats": state.ingestor().formats().extensions(),
        "ocr": {
            "engine": extractor.ocr_engine(),
            "rasterizer": extractor.rasterizer(),
        },
        "llm": {
            "provider": provider.name(),
            "model": provider.model(),
            "reachable": reachable,
        },
        "endpoints": {
            "POST /upload": "Upload and ingest one file",
            "POST /process-directory": "Ingest every supported file under a server-side directory",
            "GET /documents": "List all documents",
            "GET /document/:id": "Get one document",
            "POST /document/:id/enhance": "Run enhancement again on a stored document"
        }
    }))
}
