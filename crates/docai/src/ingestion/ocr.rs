//! OCR engines

use image::{ImageFormat, RgbImage};
use std::process::Command;

use crate::config::OcrConfig;
use crate::error::{Error, Result};

/// Recognize text in a single raster image
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &RgbImage) -> Result<String>;

    /// Engine name for logging
    fn name(&self) -> &str;
}

/// Tesseract invoked as an external process
#[derive(Debug, Clone)]
pub struct TesseractCli {
    command: String,
    language: String,
    page_seg_mode: u8,
}

impl TesseractCli {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.tesseract_cmd.clone(),
            language: config.language.clone(),
            page_seg_mode: config.page_seg_mode,
        }
    }

    /// Check if the tesseract binary can be executed
    pub fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &RgbImage) -> Result<String> {
        let temp_dir = tempfile::Builder::new()
            .prefix("docai-ocr-")
            .tempdir()
            .map_err(|e| Error::Internal(format!("Failed to create temp dir: {}", e)))?;

        let image_path = temp_dir.path().join("page.png");
        image
            .save_with_format(&image_path, ImageFormat::Png)
            .map_err(|e| Error::Internal(format!("Failed to encode page image: {}", e)))?;

        let output = Command::new(&self.command)
            .arg(&image_path)
            .arg("stdout")
            .args(["-l", &self.language])
            .args(["--psm", &self.page_seg_mode.to_string()])
            .output()
            .map_err(|e| Error::Internal(format!("Failed to run {}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Internal(format!("tesseract error: {}", stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}
