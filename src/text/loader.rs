use crate::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Read the full text of a document: PDFs through `lopdf`, anything else as UTF-8.
///
/// Blocking; call from `spawn_blocking` inside async code.
pub fn load_text(path: &Path) -> Result<String> {
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        pdf_text(path)
    } else {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn pdf_text(path: &Path) -> Result<String> {
    let document = lopdf::Document::load(path).map_err(|e| Error::Parse {
        context: path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut text = String::new();
    for page_number in document.get_pages().keys() {
        match document.extract_text(&[*page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => debug!("Skipping unreadable page {} of {:?}: {}", page_number, path, e),
        }
    }
    Ok(text)
}
