//! docai: document ingestion with format-aware text extraction
//!
//! Files are archived, their text is extracted according to their format
//! (PDF text layer with an OCR fallback, DOCX, XLSX, raster images),
//! optionally refined by a language model, and stored in SQLite.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod server;
pub mod storage;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::DocaiConfig;
pub use error::{Error, Result};
pub use ingestion::{Ingestor, TextExtractor};
pub use types::{DocumentRecord, FileOutcome, FileType, IngestReport, SupportedFormats};
