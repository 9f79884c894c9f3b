//! Document types: file formats, stored records and their public view

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document (text layer, OCR fallback for scans)
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Excel spreadsheet (.xlsx)
    Xlsx,
    /// PNG image (OCR)
    Png,
    /// JPEG image with .jpg suffix (OCR)
    Jpg,
    /// JPEG image with .jpeg suffix (OCR)
    Jpeg,
}

/// How text is obtained for a file type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Text layer first, rasterize + OCR when the layer is empty
    Pdf,
    /// Paragraph text of a word-processing document
    WordProcessing,
    /// Non-empty cell values, row by row, sheet by sheet
    Spreadsheet,
    /// OCR over the decoded image
    Image,
}

impl FileType {
    /// All known file types
    pub const ALL: [FileType; 6] = [
        FileType::Pdf,
        FileType::Docx,
        FileType::Xlsx,
        FileType::Png,
        FileType::Jpg,
        FileType::Jpeg,
    ];

    /// Detect file type from an extension (case-insensitive, no leading dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "xlsx" => Some(Self::Xlsx),
            "png" => Some(Self::Png),
            "jpg" => Some(Self::Jpg),
            "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Canonical lower-case extension
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Xlsx => "xlsx",
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
        }
    }

    pub fn strategy(&self) -> ExtractionStrategy {
        match self {
            Self::Pdf => ExtractionStrategy::Pdf,
            Self::Docx => ExtractionStrategy::WordProcessing,
            Self::Xlsx => ExtractionStrategy::Spreadsheet,
            Self::Png | Self::Jpg | Self::Jpeg => ExtractionStrategy::Image,
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Lower-cased extension of a path, without the leading dot
pub fn path_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// The process-wide set of accepted formats.
///
/// One value gates upload validation, extraction and directory filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedFormats {
    types: BTreeSet<FileType>,
}

impl SupportedFormats {
    /// Build from configured extensions; unknown extensions are a config error
    pub fn from_extensions<S: AsRef<str>>(extensions: &[S]) -> Result<Self> {
        let mut types = BTreeSet::new();
        for ext in extensions {
            let ext = ext.as_ref().trim().trim_start_matches('.');
            let file_type = FileType::from_extension(ext).ok_or_else(|| {
                Error::Config(format!("Unknown format in supported_formats: {}", ext))
            })?;
            types.insert(file_type);
        }

        if types.is_empty() {
            return Err(Error::Config("supported_formats must not be empty".to_string()));
        }

        Ok(Self { types })
    }

    /// Every known format
    pub fn all() -> Self {
        Self {
            types: FileType::ALL.into_iter().collect(),
        }
    }

    pub fn contains(&self, file_type: FileType) -> bool {
        self.types.contains(&file_type)
    }

    /// Resolve and check the suffix of `path` without touching the filesystem
    pub fn file_type_of(&self, path: &Path) -> Result<FileType> {
        let ext = path_extension(path).unwrap_or_default();
        match FileType::from_extension(&ext) {
            Some(file_type) if self.contains(file_type) => Ok(file_type),
            _ => Err(Error::UnsupportedFormat(if ext.is_empty() {
                "(none)".to_string()
            } else {
                ext
            })),
        }
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        self.file_type_of(path).is_ok()
    }

    /// Accepted extensions in a stable order
    pub fn extensions(&self) -> Vec<&'static str> {
        self.types.iter().map(|t| t.extension()).collect()
    }
}

impl Default for SupportedFormats {
    fn default() -> Self {
        Self::all()
    }
}

/// A stored document row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    pub id: i64,
    /// Original filename as supplied by the caller
    pub filename: String,
    /// Lower-cased extension without the dot
    pub file_type: String,
    pub content: Option<String>,
    /// Path of the archived copy
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a record
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub file_type: String,
    pub content: String,
    pub storage_path: String,
}

/// Externally visible shape of a document (no storage path)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentView {
    pub id: i64,
    pub filename: String,
    pub file_type: String,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DocumentRecord> for DocumentView {
    fn from(record: DocumentRecord) -> Self {
        Self {
            id: record.id,
            filename: record.filename,
            file_type: record.file_type,
            content: record.content,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
