use anyhow::{Context, Result};
use lopdf::Document;
use tracing::{debug, warn};

/// Extract the text of every page, in page order
pub(super) fn extract_pages(bytes: &[u8]) -> Result<Vec<String>> {
    let document = Document::load_mem(bytes).context("Failed to load PDF")?;
    let pages = document.get_pages();
    debug!("PDF has {} pages", pages.len());

    let mut texts = Vec::with_capacity(pages.len());
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => texts.push(text),
            Err(e) => {
                // Keep the page so numbering still matches the source
                warn!("Could not extract text from page {}: {}", page_number, e);
                texts.push(String::new());
            }
        }
    }

    Ok(texts)
}
