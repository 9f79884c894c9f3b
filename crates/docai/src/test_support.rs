//! Shared fixtures and fakes for unit tests

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::generation::Enhancer;
use crate::ingestion::{Ingestor, OcrEngine, PdfSource, Rasterizer, TextExtractor};
use crate::providers::{CompletionRequest, LlmError, LlmProvider};
use crate::storage::{ArchiveStore, DocumentRepository, SqliteDocumentRepository};
use crate::types::{DocumentRecord, NewDocument, SupportedFormats};

/// One page of a generated PDF
#[derive(Debug, Clone, Copy)]
pub enum PdfPage<'a> {
    /// Text drawn with Helvetica
    Text(&'a str),
    /// Text drawn with a Type0 Identity-H font that has no ToUnicode map
    UnmappedText(&'a str),
    /// A filled rectangle and no text
    Blank,
}

/// A PDF with one page per entry; `None` pages carry only a filled rectangle
pub fn pdf_with_pages(pages: &[Option<&str>]) -> Vec<u8> {
    let pages: Vec<PdfPage<'_>> = pages
        .iter()
        .map(|page| match page {
            Some(text) => PdfPage::Text(*text),
            None => PdfPage::Blank,
        })
        .collect();
    pdf_with_page_kinds(&pages)
}

pub fn pdf_with_page_kinds(pages: &[PdfPage<'_>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let helvetica_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let type0_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "Identity",
        "Encoding" => "Identity-H",
    });

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let (font_id, operations) = match page {
            PdfPage::Text(text) => (helvetica_id, text_operations(text)),
            PdfPage::UnmappedText(text) => (type0_id, text_operations(text)),
            PdfPage::Blank => (
                helvetica_id,
                vec![
                    Operation::new("re", vec![100.into(), 100.into(), 200.into(), 200.into()]),
                    Operation::new("f", vec![]),
                ],
            ),
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content stream"),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("serialize PDF");
    buf
}

fn text_operations(text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 24.into()]),
        Operation::new("Td", vec![72.into(), 700.into()]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

/// A DOCX with one body paragraph per entry; empty strings give empty paragraphs
pub fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let mut docx = docx_rs::Docx::new();
    for text in paragraphs {
        let paragraph = if text.is_empty() {
            docx_rs::Paragraph::new()
        } else {
            docx_rs::Paragraph::new().add_run(docx_rs::Run::new().add_text(*text))
        };
        docx = docx.add_paragraph(paragraph);
    }

    let mut buf = Vec::new();
    docx.build()
        .pack(&mut Cursor::new(&mut buf))
        .expect("pack DOCX");
    buf
}

/// A minimal XLSX package; cells that parse as numbers are written as numbers
pub fn xlsx_with_sheets(sheets: &[Vec<Vec<Option<&str>>>]) -> Vec<u8> {
    use zip::write::SimpleFileOptions;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));

    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    let mut workbook_sheets = String::new();
    let mut workbook_rels = String::new();

    for index in 1..=sheets.len() {
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            index
        ));
        workbook_sheets.push_str(&format!(
            r#"<sheet name="Sheet{0}" sheetId="{0}" r:id="rId{0}"/>"#,
            index
        ));
        workbook_rels.push_str(&format!(
            r#"<Relationship Id="rId{0}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{0}.xml"/>"#,
            index
        ));
    }
    content_types.push_str("</Types>");

    let mut write = |name: &str, body: &str| {
        zip.start_file(name, SimpleFileOptions::default()).expect("start zip entry");
        zip.write_all(body.as_bytes()).expect("write zip entry");
    };

    write("[Content_Types].xml", &content_types);
    write(
        "_rels/.rels",
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
    );
    write(
        "xl/workbook.xml",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{}</sheets></workbook>"#,
            workbook_sheets
        ),
    );
    write(
        "xl/_rels/workbook.xml.rels",
        &format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
            workbook_rels
        ),
    );

    for (index, rows) in sheets.iter().enumerate() {
        write(
            &format!("xl/worksheets/sheet{}.xml", index + 1),
            &sheet_xml(rows),
        );
    }

    zip.finish().expect("finish zip").into_inner()
}

fn sheet_xml(rows: &[Vec<Option<&str>>]) -> String {
    let mut data = String::new();
    for (r, row) in rows.iter().enumerate() {
        let cells: String = row
            .iter()
            .enumerate()
            .filter_map(|(c, cell)| cell.map(|value| (c, value)))
            .map(|(c, value)| {
                let reference = format!("{}{}", (b'A' + c as u8) as char, r + 1);
                if value.parse::<f64>().is_ok() {
                    format!(r#"<c r="{}"><v>{}</v></c>"#, reference, value)
                } else {
                    format!(
                        r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        reference,
                        xml_escape(value)
                    )
                }
            })
            .collect();
        if !cells.is_empty() {
            data.push_str(&format!(r#"<row r="{}">{}</row>"#, r + 1, cells));
        }
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
        data
    )
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A small PNG whose pixels all have the given grey level
pub fn png_image(shade: u8) -> Vec<u8> {
    let image = RgbImage::from_pixel(4, 4, Rgb([shade, shade, shade]));
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode PNG");
    buf
}

/// OCR fake: reports the grey level of the first pixel as `page <n>`
#[derive(Default)]
pub struct RecordingOcr {
    calls: AtomicUsize,
}

impl RecordingOcr {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl OcrEngine for RecordingOcr {
    fn recognize(&self, image: &RgbImage) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("page {}\n", image.get_pixel(0, 0)[0]))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Rasterizer fake: one image per PDF page, shaded with the page index
#[derive(Default)]
pub struct StubRasterizer {
    calls: AtomicUsize,
    last_dpi: Mutex<Option<u32>>,
}

impl StubRasterizer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_dpi(&self) -> Option<u32> {
        *self.last_dpi.lock()
    }
}

impl Rasterizer for StubRasterizer {
    fn rasterize(&self, source: PdfSource<'_>, dpi: u32) -> Result<Vec<RgbImage>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_dpi.lock() = Some(dpi);

        let document = match source {
            PdfSource::Path(path) => Document::load(path),
            PdfSource::Bytes(bytes) => Document::load_mem(bytes),
        }
        .map_err(|e| Error::Internal(e.to_string()))?;

        Ok((0..document.get_pages().len())
            .map(|i| RgbImage::from_pixel(2, 2, Rgb([i as u8, 0, 0])))
            .collect())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// LLM fake that replays scripted results, then repeats its fallback
pub struct ScriptedLlm {
    script: Mutex<VecDeque<std::result::Result<String, LlmError>>>,
    fallback: std::result::Result<String, LlmError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn always(text: &str) -> Self {
        Self::with_fallback(VecDeque::new(), Ok(text.to_string()))
    }

    /// Replay `results`; once exhausted every call fails as malformed
    pub fn sequence(results: Vec<std::result::Result<String, LlmError>>) -> Self {
        Self::with_fallback(
            results.into(),
            Err(LlmError::Malformed("script exhausted".to_string())),
        )
    }

    fn with_fallback(
        script: VecDeque<std::result::Result<String, LlmError>>,
        fallback: std::result::Result<String, LlmError>,
    ) -> Self {
        Self {
            script: Mutex::new(script),
            fallback,
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, request: &CompletionRequest) -> std::result::Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

/// Repository that rejects every operation
pub struct FailingRepository;

impl DocumentRepository for FailingRepository {
    fn create(&self, _document: NewDocument) -> Result<DocumentRecord> {
        Err(Error::persistence("database is read-only"))
    }

    fn get_by_id(&self, _id: i64) -> Result<Option<DocumentRecord>> {
        Err(Error::persistence("database is read-only"))
    }

    fn list(&self) -> Result<Vec<DocumentRecord>> {
        Err(Error::persistence("database is read-only"))
    }

    fn update_content(&self, _id: i64, _content: &str) -> Result<Option<DocumentRecord>> {
        Err(Error::persistence("database is read-only"))
    }
}

/// A pipeline over fakes, an in-memory database and an archive under `dir`
pub struct TestPipeline {
    pub ingestor: Ingestor,
    pub llm: Arc<ScriptedLlm>,
    pub archive_dir: PathBuf,
}

pub fn test_pipeline(dir: &Path, llm: ScriptedLlm) -> TestPipeline {
    let llm = Arc::new(llm);
    let archive_dir = dir.join("archive");

    let extractor = TextExtractor::new(
        SupportedFormats::all(),
        Arc::new(RecordingOcr::default()),
        Arc::new(StubRasterizer::default()),
    );
    let enhancer = Enhancer::new(llm.clone(), &LlmConfig::default())
        .with_attempt_timeout(Duration::from_secs(2))
        .with_retry_base_delay(Duration::from_millis(1));

    let ingestor = Ingestor::new(
        Arc::new(extractor),
        Arc::new(enhancer),
        Arc::new(SqliteDocumentRepository::in_memory().expect("in-memory database")),
        Arc::new(ArchiveStore::new(&archive_dir).expect("archive dir")),
    );

    TestPipeline {
        ingestor,
        llm,
        archive_dir,
    }
}
