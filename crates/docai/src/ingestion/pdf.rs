//! PDF text layer extraction

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// Read the embedded text layer of a PDF, page by page.
///
/// Pages are joined with `\n` and the result is trimmed, so an image-only
/// document yields an empty string. A document that cannot be loaded at all is
/// an extraction error.
///
/// When lopdf cannot decode some pages, the whole document goes through
/// pdf-extract instead. If that pass does not recover more text than the
/// readable pages already gave, the text layer is treated as unusable and an
/// empty string is returned so the caller falls back to OCR.
pub fn extract_text_layer(label: &str, data: &[u8], timeout: Duration) -> Result<String> {
    let document = lopdf::Document::load_mem(data)
        .map_err(|e| Error::extraction(label, format!("invalid PDF: {}", e)))?;

    let pages = document.get_pages();
    let mut texts = Vec::with_capacity(pages.len());
    let mut failed_pages = Vec::new();

    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => texts.push(text),
            Err(e) => {
                tracing::warn!("[{}] cannot decode text on page {}: {}", label, page_number, e);
                failed_pages.push(*page_number);
            }
        }
    }

    Ok(reconcile_pages(label, texts, &failed_pages, || {
        extract_with_timeout(label, data, timeout)
    }))
}

/// Combine per-page results, consulting `whole_document` when any page failed
fn reconcile_pages<F>(label: &str, texts: Vec<String>, failed_pages: &[u32], whole_document: F) -> String
where
    F: FnOnce() -> Result<String>,
{
    let partial = texts.join("\n").trim().to_string();
    if failed_pages.is_empty() {
        return partial;
    }

    tracing::warn!(
        "[{}] text decoding failed on pages {:?}, trying whole-document pass",
        label,
        failed_pages
    );

    match whole_document() {
        Ok(text) if visible_chars(&text) > visible_chars(&partial) => text.trim().to_string(),
        Ok(_) => {
            tracing::warn!(
                "[{}] whole-document pass recovered nothing from pages {:?}; text layer unusable, falling back to OCR",
                label,
                failed_pages
            );
            String::new()
        }
        Err(e) => {
            tracing::warn!(
                "[{}] text layer unusable ({}); falling back to OCR",
                label,
                e
            );
            String::new()
        }
    }
}

fn visible_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Whole-document extraction with pdf-extract on a worker thread.
///
/// pdf-extract can spin on unusual fonts and panics on some inputs; both end
/// up as an error here instead of taking the caller down.
fn extract_with_timeout(label: &str, data: &[u8], timeout: Duration) -> Result<String> {
    let data_vec = data.to_vec();
    let (tx, rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        let result = pdf_extract::extract_text_from_mem(&data_vec);
        let _ = tx.send(result.map_err(|e| e.to_string()));
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(text)) => {
            let _ = handle.join();
            Ok(text)
        }
        Ok(Err(message)) => {
            let _ = handle.join();
            tracing::warn!("[{}] pdf-extract failed: {}", label, message);
            Err(Error::extraction(label, message))
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::error!("[{}] pdf-extract timed out after {:?}", label, timeout);
            Err(Error::extraction(label, "text extraction timed out"))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            tracing::error!("[{}] pdf-extract thread crashed", label);
            Err(Error::extraction(label, "text extraction crashed"))
        }
    }
}
