//! Core types for the ingestion pipeline

pub mod document;
pub mod outcome;
pub mod response;

pub use document::{
    path_extension, DocumentRecord, DocumentView, ExtractionStrategy, FileType, NewDocument,
    SupportedFormats,
};
pub use outcome::{FailureSummary, FileOutcome, FileStage, IngestReport};
pub use response::{DirectoryResponse, DocumentListResponse, UploadResponse};
