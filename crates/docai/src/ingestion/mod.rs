//! Document ingestion: text extraction and the pipeline around it

pub mod extractor;
pub mod ocr;
pub mod orchestrator;
pub mod pdf;
pub mod rasterizer;

pub use extractor::{TextExtractor, DEFAULT_OCR_DPI};
pub use ocr::{OcrEngine, TesseractCli};
pub use orchestrator::Ingestor;
pub use rasterizer::{
    select_rasterizer, PdfSource, PdfiumRasterizer, PdftoppmRasterizer, Rasterizer,
    UnavailableRasterizer,
};
