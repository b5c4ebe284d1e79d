use crate::error::IngestError;
use lopdf::Document;
use tracing::warn;

const PDF_SIGNATURE: &[u8] = b"%PDF-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    pub page_count: u32,
    pub pages: Vec<PageText>,
}

pub trait PdfExtractor: Send + Sync {
    fn extract_pages(&self, bytes: &[u8]) -> Result<ExtractedDocument, IngestError>;
}

/// Checks the header signature. Some producers put junk before it, so the
/// first kilobyte is searched rather than only offset zero.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(PDF_SIGNATURE.len())
        .any(|window| window == PDF_SIGNATURE)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> Result<ExtractedDocument, IngestError> {
        let document =
            Document::load_mem(bytes).map_err(|error| IngestError::PdfParse(error.to_string()))?;

        let page_numbers = document.get_pages().into_keys().collect::<Vec<_>>();
        let page_count = u32::try_from(page_numbers.len()).unwrap_or(u32::MAX);

        let mut pages = Vec::new();
        for page_no in page_numbers {
            match document.extract_text(&[page_no]) {
                Ok(text) if !text.trim().is_empty() => pages.push(PageText {
                    number: page_no,
                    text,
                }),
                Ok(_) => {}
                Err(error) => warn!(page = page_no, %error, "skipping unreadable page"),
            }
        }

        if pages.is_empty() {
            return Err(IngestError::PdfParse(
                "pdf had no readable page text".to_string(),
            ));
        }

        Ok(ExtractedDocument { page_count, pages })
    }
}
