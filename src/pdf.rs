//! Turn report markup into PDF bytes with printpdf.

use std::collections::BTreeMap;

use printpdf::{Base64OrRaw, GeneratePdfOptions, PdfDocument, PdfSaveOptions};
use tracing::debug;

use crate::error::ReportError;
use crate::markup::PageSize;

#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
}

/// Lay out `html` on pages of `page` size and serialize it.
///
/// `images` maps the `src` keys used in the markup to encoded image bytes.
pub fn render(
    html: &str,
    images: BTreeMap<String, Vec<u8>>,
    page: &PageSize,
    info: &DocumentInfo,
) -> Result<Vec<u8>, ReportError> {
    let images: BTreeMap<String, Base64OrRaw> = images
        .into_iter()
        .map(|(key, bytes)| (key, Base64OrRaw::Raw(bytes)))
        .collect();
    let options = GeneratePdfOptions {
        page_width: Some(page.width_mm),
        page_height: Some(page.height_mm),
        ..Default::default()
    };

    let mut warnings = Vec::new();
    let mut doc =
        PdfDocument::from_html(html, &images, &BTreeMap::new(), &options, &mut warnings)
            .map_err(|e| ReportError::render("failed to lay out report", e))?;
    if doc.pages.is_empty() {
        return Err(ReportError::Render("layout produced no pages".to_string()));
    }
    debug!("laid out {} pages", doc.pages.len());

    doc.metadata.info.document_title = info.title.clone();
    doc.metadata.info.author = info.author.clone();
    doc.metadata.info.creator =
        concat!("enrollment-report ", env!("CARGO_PKG_VERSION")).to_string();

    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    debug!("{} renderer messages", warnings.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{self, Block, Role, StyleSheet};

    fn info() -> DocumentInfo {
        DocumentInfo {
            title: "Test".to_string(),
            author: "José Núñez".to_string(),
        }
    }

    fn page_count(bytes: &[u8]) -> usize {
        lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[test]
    fn renders_a_single_page_document() {
        let html = markup::to_html(
            "Test",
            &[Block::paragraph("Hello", Role::Normal)],
            &StyleSheet::default(),
            &PageSize::letter(),
        );
        let bytes = render(&html, BTreeMap::new(), &PageSize::letter(), &info()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn long_content_flows_onto_more_pages() {
        let blocks: Vec<Block> = (0..200)
            .map(|i| Block::paragraph(format!("line {i}"), Role::Normal))
            .collect();
        let html = markup::to_html("Test", &blocks, &StyleSheet::default(), &PageSize::letter());
        let bytes = render(&html, BTreeMap::new(), &PageSize::letter(), &info()).unwrap();
        assert!(page_count(&bytes) > 1);
    }
}
