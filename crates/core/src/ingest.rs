use crate::{
    build_chunks, looks_like_pdf, DocumentChunk, DocumentFingerprint, IngestError,
    IngestionOptions, PdfExtractor,
};
use chrono::Utc;
use sha2::{Digest, Sha256};

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct PreparedDocument {
    pub fingerprint: DocumentFingerprint,
    pub chunks: Vec<DocumentChunk>,
}

/// Validates, extracts and splits one upload. CPU bound; callers on an async
/// runtime should run it on the blocking pool.
pub fn prepare_document(
    file_name: &str,
    bytes: &[u8],
    extractor: &dyn PdfExtractor,
    options: &IngestionOptions,
) -> Result<PreparedDocument, IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::EmptyUpload);
    }
    if !looks_like_pdf(bytes) {
        return Err(IngestError::NotPdf(file_name.to_string()));
    }

    let extracted = extractor.extract_pages(bytes)?;
    let checksum = digest_bytes(bytes);

    let fingerprint = DocumentFingerprint {
        document_id: checksum.clone(),
        file_name: file_name.to_string(),
        checksum,
        size_bytes: bytes.len(),
        page_count: extracted.page_count,
        ingested_at: Utc::now(),
    };

    let chunks = build_chunks(&fingerprint, &extracted.pages, options)?;

    Ok(PreparedDocument {
        fingerprint,
        chunks,
    })
}
