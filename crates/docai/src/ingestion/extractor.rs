//! Format-dispatched text extraction
//!
//! The lower-cased suffix alone decides how a file is read:
//!
//! | Strategy        | Formats            | Source of text                        |
//! |-----------------|--------------------|---------------------------------------|
//! | Pdf             | pdf                | text layer, else rasterize + OCR      |
//! | WordProcessing  | docx               | body paragraphs                       |
//! | Spreadsheet     | xlsx               | non-empty cells, row by row           |
//! | Image           | png, jpg, jpeg     | OCR                                   |

use calamine::{open_workbook_from_rs, Reader, Xlsx};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::DocaiConfig;
use crate::error::{Error, Result};
use crate::types::{ExtractionStrategy, SupportedFormats};

use super::ocr::{OcrEngine, TesseractCli};
use super::pdf::extract_text_layer;
use super::rasterizer::{select_rasterizer, PdfSource, Rasterizer};

/// Default rasterization resolution for scanned PDFs
pub const DEFAULT_OCR_DPI: u32 = 300;

/// Produces raw text for a file using a type-specific strategy
pub struct TextExtractor {
    formats: SupportedFormats,
    ocr: Arc<dyn OcrEngine>,
    rasterizer: Arc<dyn Rasterizer>,
    dpi: u32,
    pdf_text_timeout: Duration,
}

impl TextExtractor {
    pub fn new(
        formats: SupportedFormats,
        ocr: Arc<dyn OcrEngine>,
        rasterizer: Arc<dyn Rasterizer>,
    ) -> Self {
        Self {
            formats,
            ocr,
            rasterizer,
            dpi: DEFAULT_OCR_DPI,
            pdf_text_timeout: Duration::from_secs(60),
        }
    }

    /// Build with tesseract and the best available rasterizer
    pub fn from_config(config: &DocaiConfig) -> Result<Self> {
        let tesseract = TesseractCli::new(&config.ocr);
        if !tesseract.is_available() {
            tracing::warn!(
                "{} not found; image files and scanned PDFs will fail to extract",
                config.ocr.tesseract_cmd
            );
        }

        Ok(Self::new(
            config.supported_formats()?,
            Arc::new(tesseract),
            select_rasterizer(&config.ocr),
        )
        .with_dpi(config.ocr.dpi)
        .with_pdf_text_timeout(Duration::from_secs(config.ocr.pdf_text_timeout_secs)))
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_pdf_text_timeout(mut self, timeout: Duration) -> Self {
        self.pdf_text_timeout = timeout;
        self
    }

    pub fn formats(&self) -> &SupportedFormats {
        &self.formats
    }

    pub fn ocr_engine(&self) -> &str {
        self.ocr.name()
    }

    pub fn rasterizer(&self) -> &str {
        self.rasterizer.name()
    }

    /// Extract the raw text of `path`.
    ///
    /// The suffix is checked before the filesystem is touched. Empty text is a
    /// valid result; unreadable or corrupt input is `ExtractionFailed`.
    pub fn extract_text(&self, path: &Path) -> Result<String> {
        let file_type = self.formats.file_type_of(path)?;
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
            _ => Error::extraction(&label, format!("unreadable: {}", e)),
        })?;

        tracing::debug!("[{}] extracting {} bytes as {}", label, data.len(), file_type);

        match file_type.strategy() {
            ExtractionStrategy::Pdf => self.extract_pdf(&label, &data),
            ExtractionStrategy::WordProcessing => extract_docx(&label, &data),
            ExtractionStrategy::Spreadsheet => extract_xlsx(&label, &data),
            ExtractionStrategy::Image => self.extract_image(&label, &data),
        }
    }

    fn extract_pdf(&self, label: &str, data: &[u8]) -> Result<String> {
        let text = extract_text_layer(label, data, self.pdf_text_timeout)?;
        if !text.is_empty() {
            return Ok(text);
        }

        tracing::info!(
            "[{}] no usable text layer, rasterizing via {} at {} DPI for {} OCR",
            label,
            self.rasterizer.name(),
            self.dpi,
            self.ocr.name()
        );

        let pages = self
            .rasterizer
            .rasterize(PdfSource::Bytes(data), self.dpi)
            .map_err(|e| Error::extraction(label, format!("rasterization failed: {}", e)))?;

        let mut texts = Vec::with_capacity(pages.len());
        for (index, page) in pages.iter().enumerate() {
            let text = self.ocr.recognize(page).map_err(|e| {
                Error::extraction(label, format!("OCR failed on page {}: {}", index + 1, e))
            })?;
            texts.push(text);
        }

        let text = texts.join("\n").trim().to_string();
        tracing::info!(
            "[{}] OCR extracted {} characters from {} pages",
            label,
            text.len(),
            pages.len()
        );
        Ok(text)
    }

    fn extract_image(&self, label: &str, data: &[u8]) -> Result<String> {
        let image = image::load_from_memory(data)
            .map_err(|e| Error::extraction(label, format!("invalid image: {}", e)))?
            .to_rgb8();

        tracing::debug!(
            "[{}] running {} OCR on {}x{} image",
            label,
            self.ocr.name(),
            image.width(),
            image.height()
        );

        self.ocr
            .recognize(&image)
            .map_err(|e| Error::extraction(label, format!("OCR failed: {}", e)))
    }
}

/// Body paragraphs in document order, one line each
fn extract_docx(label: &str, data: &[u8]) -> Result<String> {
    let doc = docx_rs::read_docx(data)
        .map_err(|e| Error::extraction(label, format!("invalid DOCX: {}", e)))?;

    let mut paragraphs = Vec::new();
    for child in doc.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            let mut text = String::new();
            for child in p.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        match child {
                            docx_rs::RunChild::Text(t) => text.push_str(&t.text),
                            docx_rs::RunChild::Tab(_) => text.push('\t'),
                            docx_rs::RunChild::Break(_) => text.push('\n'),
                            _ => {}
                        }
                    }
                }
            }
            paragraphs.push(text);
        }
    }

    Ok(paragraphs.join("\n"))
}

/// Non-empty cells joined by spaces, rows by newlines, sheets in order
fn extract_xlsx(label: &str, data: &[u8]) -> Result<String> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(data))
        .map_err(|e| Error::extraction(label, format!("invalid XLSX: {}", e)))?;

    let mut lines = Vec::new();
    for sheet_name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
            Error::extraction(label, format!("unreadable sheet '{}': {}", sheet_name, e))
        })?;

        for row in range.rows() {
            let cells: Vec<String> = row.iter().filter_map(cell_text).collect();
            if !cells.is_empty() {
                lines.push(cells.join(" "));
            }
        }
    }

    Ok(lines.join("\n"))
}

fn cell_text(cell: &calamine::Data) -> Option<String> {
    match cell {
        calamine::Data::Empty | calamine::Data::Error(_) => None,
        calamine::Data::String(s) if s.is_empty() => None,
        calamine::Data::String(s) => Some(s.clone()),
        calamine::Data::Float(f) => Some(format_float(*f)),
        calamine::Data::Int(i) => Some(i.to_string()),
        calamine::Data::Bool(b) => Some(b.to_string()),
        calamine::Data::DateTime(dt) => Some(
            dt.as_datetime()
                .map(|ndt| {
                    if ndt.time() == chrono::NaiveTime::MIN {
                        ndt.format("%Y-%m-%d").to_string()
                    } else {
                        ndt.format("%Y-%m-%d %H:%M:%S").to_string()
                    }
                })
                .unwrap_or_else(|| dt.as_f64().to_string()),
        ),
        calamine::Data::DateTimeIso(s) | calamine::Data::DurationIso(s) => Some(s.clone()),
    }
}

/// Integral values print without a fractional part
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}
