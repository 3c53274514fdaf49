use std::path::Path;

use lopdf::Document;
use tracing::{debug, warn};

use crate::error::{ExtractError, Result};
use crate::model::RawPage;

/// Text of every page in document order. A page whose text cannot be
/// extracted becomes an empty page; the document itself failing to load is
/// fatal.
pub fn read_pdf_pages(path: &Path) -> Result<Vec<RawPage>> {
    let doc = Document::load(path).map_err(|e| ExtractError::UnreadablePdf {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let pages = doc
        .get_pages()
        .into_keys()
        .map(|number| {
            let text = doc.extract_text(&[number]).unwrap_or_else(|e| {
                warn!("Page {} of {}: {}", number, path.display(), e);
                String::new()
            });
            debug!("Page {}: {} chars", number, text.len());
            RawPage {
                index: number as usize,
                text,
            }
        })
        .collect();
    Ok(pages)
}
