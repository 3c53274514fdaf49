pub mod pdf;

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{ExtractError, Result};
use crate::model::RawPage;

/// Reads per-page text from `path`. A `.txt` file is taken as one page of
/// already extracted text; anything else is opened as a PDF.
pub fn read_pages(path: &Path) -> Result<Vec<RawPage>> {
    let is_text = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));

    let pages = if is_text {
        let text = fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))?;
        vec![RawPage { index: 1, text }]
    } else {
        pdf::read_pdf_pages(path)?
    };

    if pages.iter().all(|page| page.text.trim().is_empty()) {
        return Err(ExtractError::UnreadablePdf {
            path: path.to_path_buf(),
            reason: "no extractable text".into(),
        });
    }
    info!("Read {} pages from {}", pages.len(), path.display());
    Ok(pages)
}

/// Concatenates page texts, each preceded by its `PAGE<n>` marker. Empty
/// pages are left out.
pub fn join_pages(pages: &[RawPage]) -> String {
    let mut joined = String::with_capacity(pages.iter().map(|p| p.text.len() + 12).sum());
    for page in pages.iter().filter(|p| !p.text.trim().is_empty()) {
        joined.push_str(&format!("\nPAGE{}\n", page.index));
        joined.push_str(&page.text);
        joined.push('\n');
    }
    joined
}
