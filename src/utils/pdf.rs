//! PDF text extraction utilities.
//!
//! Text is extracted page by page with lopdf. Documents whose pages all come
//! back empty get a second pass through the pdf-extract crate, which copes
//! better with unusual font encodings.
//!
//! Extraction is soft-failing: anything that is not a readable PDF yields
//! `None`, never an error.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Extract text from a PDF file.
///
/// Each page contributes a leading space followed by at most
/// `max_page_chars` characters of its text. Returns `None` if the file
/// cannot be read or is not a valid PDF.
///
/// # Examples
///
/// ```ignore
/// if let Some(text) = extract_text(Path::new("paper.pdf"), 20_000) {
///     println!("Extracted {} characters", text.len());
/// }
/// ```
pub fn extract_text(path: &Path, max_page_chars: usize) -> Option<String> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!("Cannot read {}: {}", path.display(), e);
            return None;
        }
    };

    let text = extract_text_from_bytes(&bytes, max_page_chars);
    if text.is_none() {
        tracing::debug!("Not a readable PDF: {}", path.display());
    }
    text
}

/// Extract text from in-memory PDF bytes. See [`extract_text`].
pub fn extract_text_from_bytes(bytes: &[u8], max_page_chars: usize) -> Option<String> {
    if !bytes.starts_with(PDF_SIGNATURE) {
        return None;
    }

    let document = lopdf::Document::load_mem(bytes).ok()?;
    let pages = document.get_pages();
    if pages.is_empty() {
        return None;
    }

    let mut text = String::new();
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => {
                text.push(' ');
                text.extend(page_text.chars().take(max_page_chars));
            }
            Err(e) => tracing::debug!("Skipping page {}: {}", page_number, e),
        }
    }

    if text.trim().is_empty() {
        if let Some(fallback) = extract_with_pdf_extract(bytes, max_page_chars) {
            return Some(fallback);
        }
    }

    Some(text)
}

/// Whole-document extraction through pdf-extract. The crate panics on some
/// malformed inputs, so panics are contained here.
fn extract_with_pdf_extract(bytes: &[u8], max_page_chars: usize) -> Option<String> {
    let result = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)));

    match result {
        Ok(Ok(text)) if !text.trim().is_empty() => Some(
            // pdf-extract separates pages with form feeds
            text.split('\u{c}')
                .map(|page| format!(" {}", page.chars().take(max_page_chars).collect::<String>()))
                .collect(),
        ),
        Ok(Ok(_)) => None,
        Ok(Err(e)) => {
            tracing::debug!("pdf-extract failed: {}", e);
            None
        }
        Err(_) => {
            tracing::debug!("pdf-extract panicked");
            None
        }
    }
}
