//! PDF page rasterization for the OCR fallback
//!
//! Two backends are supported: pdfium rendered in-process and poppler's
//! `pdftoppm`. One is chosen at startup by probing; when neither is present
//! image-only PDFs fail with an extraction error instead of the whole service.

use image::RgbImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use crate::config::OcrConfig;
use crate::error::{Error, Result};

/// Where the PDF bytes come from
#[derive(Debug, Clone, Copy)]
pub enum PdfSource<'a> {
    Path(&'a Path),
    Bytes(&'a [u8]),
}

/// Render every page of a PDF, in page order
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, source: PdfSource<'_>, dpi: u32) -> Result<Vec<RgbImage>>;

    fn name(&self) -> &str;
}

/// In-process renderer backed by the pdfium shared library
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_dir: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }

    fn bind(&self) -> Result<Pdfium> {
        let bindings = match &self.library_dir {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| Error::Internal(format!("pdfium bind failed: {}", e)))?;

        Ok(Pdfium::new(bindings))
    }

    /// Check if the pdfium library can be loaded
    pub fn is_available(&self) -> bool {
        self.bind().is_ok()
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn rasterize(&self, source: PdfSource<'_>, dpi: u32) -> Result<Vec<RgbImage>> {
        let pdfium = self.bind()?;

        let document = match source {
            PdfSource::Path(path) => pdfium.load_pdf_from_file(path, None),
            PdfSource::Bytes(bytes) => pdfium.load_pdf_from_byte_slice(bytes, None),
        }
        .map_err(|e| Error::Internal(format!("pdfium open failed: {}", e)))?;

        let scale = dpi as f32 / 72.0;
        let page_count = document.pages().len();
        let mut images = Vec::with_capacity(page_count as usize);

        for index in 0..page_count {
            let page = document
                .pages()
                .get(index)
                .map_err(|e| Error::Internal(format!("page {} access failed: {}", index + 1, e)))?;

            let width = (page.width().value * scale) as i32;
            let height = (page.height().value * scale) as i32;

            let bitmap = page
                .render_with_config(
                    &PdfRenderConfig::new()
                        .set_target_width(width)
                        .set_target_height(height),
                )
                .map_err(|e| Error::Internal(format!("render page {} failed: {}", index + 1, e)))?;

            images.push(bitmap.as_image().to_rgb8());
        }

        Ok(images)
    }

    fn name(&self) -> &str {
        "pdfium"
    }
}

/// Renderer that shells out to poppler's `pdftoppm`
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    command: String,
}

impl PdftoppmRasterizer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Check if pdftoppm can be executed
    pub fn is_available(&self) -> bool {
        // pdftoppm -v prints to stderr and may exit non-zero
        Command::new(&self.command).arg("-v").output().is_ok()
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(&self, source: PdfSource<'_>, dpi: u32) -> Result<Vec<RgbImage>> {
        let temp_dir = tempfile::Builder::new()
            .prefix("docai-raster-")
            .tempdir()
            .map_err(|e| Error::Internal(format!("Failed to create temp dir: {}", e)))?;

        let input = match source {
            PdfSource::Path(path) => path.to_path_buf(),
            PdfSource::Bytes(bytes) => {
                let path = temp_dir.path().join("input.pdf");
                std::fs::write(&path, bytes)
                    .map_err(|e| Error::Internal(format!("Failed to write temp PDF: {}", e)))?;
                path
            }
        };

        let output = Command::new(&self.command)
            .args(["-r", &dpi.to_string(), "-png"])
            .arg(&input)
            .arg(temp_dir.path().join("page"))
            .output()
            .map_err(|e| Error::Internal(format!("Failed to run {}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Internal(format!("pdftoppm error: {}", stderr.trim())));
        }

        let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(temp_dir.path())
            .map_err(|e| Error::Internal(format!("Failed to read temp dir: {}", e)))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter_map(|p| page_number(&p).map(|n| (n, p)))
            .collect();
        pages.sort_by_key(|(n, _)| *n);

        if pages.is_empty() {
            return Err(Error::Internal("pdftoppm produced no images".to_string()));
        }

        pages
            .iter()
            .map(|(n, path)| {
                image::open(path)
                    .map(|img| img.to_rgb8())
                    .map_err(|e| Error::Internal(format!("Failed to decode page {}: {}", n, e)))
            })
            .collect()
    }

    fn name(&self) -> &str {
        "pdftoppm"
    }
}

/// Page number from a `page-<n>.png` output name
fn page_number(path: &Path) -> Option<u32> {
    if path.extension()? != "png" {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("page-")?
        .parse()
        .ok()
}

/// Placeholder used when no rasterization backend is installed
#[derive(Debug, Clone, Default)]
pub struct UnavailableRasterizer;

impl Rasterizer for UnavailableRasterizer {
    fn rasterize(&self, _source: PdfSource<'_>, _dpi: u32) -> Result<Vec<RgbImage>> {
        Err(Error::Internal(
            "no PDF rasterizer available; install pdfium or poppler-utils (pdftoppm)".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Probe the configured backends once and pick the first that works
pub fn select_rasterizer(config: &OcrConfig) -> Arc<dyn Rasterizer> {
    if config.prefer_pdfium {
        let pdfium = PdfiumRasterizer::new(config.pdfium_library_path.clone());
        if pdfium.is_available() {
            tracing::info!("Using pdfium for PDF rasterization");
            return Arc::new(pdfium);
        }
        tracing::debug!("pdfium library not found, probing {}", config.pdftoppm_cmd);
    }

    let pdftoppm = PdftoppmRasterizer::new(config.pdftoppm_cmd.clone());
    if pdftoppm.is_available() {
        tracing::info!("Using {} for PDF rasterization", config.pdftoppm_cmd);
        return Arc::new(pdftoppm);
    }

    tracing::warn!("No PDF rasterizer available; image-only PDFs will fail to extract");
    Arc::new(UnavailableRasterizer)
}
