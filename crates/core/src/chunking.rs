use crate::error::IngestError;
use crate::extractor::PageText;
use crate::models::{ChunkMetadata, DocumentChunk, DocumentFingerprint, IngestionOptions};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    pub fn validate(self) -> Result<Self, IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be positive".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(self)
    }
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
            chunk_overlap: value.chunk_overlap,
        }
    }
}

/// Collapses runs of spaces inside each line and runs of blank lines, keeping
/// paragraph breaks so the splitter can still cut on them.
pub fn normalize_page_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.replace('\u{a0}', " ").lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        out.push_str(&collapsed);
        blank_run = 0;
    }

    out
}

/// Splits `text` recursively on paragraph, line, word and character
/// boundaries, then merges neighbouring pieces back up to `chunk_size`
/// characters with up to `chunk_overlap` characters carried between chunks.
///
/// Every piece keeps the separator it was cut on as a prefix, and pieces are
/// concatenated without a joiner, matching LangChain's
/// `RecursiveCharacterTextSplitter` with its default `keepSeparator: true`.
/// Separator lengths therefore count toward both the size and the overlap.
pub fn split_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    split_recursive(text, &SEPARATORS, config)
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn split_recursive(text: &str, separators: &[&str], config: ChunkingConfig) -> Vec<String> {
    let (separator, remaining) = pick_separator(text, separators);

    let mut chunks = Vec::new();
    let mut fitting: Vec<&str> = Vec::new();

    for piece in split_keeping_separator(text, separator) {
        if char_len(piece) < config.chunk_size {
            fitting.push(piece);
            continue;
        }

        if !fitting.is_empty() {
            chunks.extend(merge_splits(&fitting, config));
            fitting.clear();
        }

        if remaining.is_empty() {
            chunks.push(piece.to_string());
        } else {
            chunks.extend(split_recursive(piece, remaining, config));
        }
    }

    if !fitting.is_empty() {
        chunks.extend(merge_splits(&fitting, config));
    }

    chunks
}

fn pick_separator<'a, 's>(text: &str, separators: &'a [&'s str]) -> (&'s str, &'a [&'s str]) {
    for (index, separator) in separators.iter().copied().enumerate() {
        if separator.is_empty() || text.contains(separator) {
            return (separator, &separators[index + 1..]);
        }
    }
    ("", &[])
}

/// Cuts before every occurrence of `separator` past the start of `text`, so
/// each piece after the first begins with it. An empty separator yields
/// single characters.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(index, ch)| &text[index..index + ch.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (index, _) in text.char_indices().skip(1) {
        if text[index..].starts_with(separator) {
            pieces.push(&text[start..index]);
            start = index;
        }
    }
    pieces.push(&text[start..]);
    pieces.retain(|piece| !piece.is_empty());
    pieces
}

fn merge_splits(splits: &[&str], config: ChunkingConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for &piece in splits {
        let piece_len = char_len(piece);

        if total + piece_len > config.chunk_size && !window.is_empty() {
            push_joined(&mut chunks, &window);

            while total > config.chunk_overlap
                || (total > 0 && total + piece_len > config.chunk_size)
            {
                let Some(front) = window.pop_front() else {
                    break;
                };
                total -= char_len(front);
            }
        }

        total += piece_len;
        window.push_back(piece);
    }

    push_joined(&mut chunks, &window);
    chunks
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>) {
    let joined = window.iter().copied().collect::<String>();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Splits every page and wraps the pieces as chunks. Chunk indexes run across
/// the whole document starting at zero.
pub fn build_chunks(
    document: &DocumentFingerprint,
    pages: &[PageText],
    options: &IngestionOptions,
) -> Result<Vec<DocumentChunk>, IngestError> {
    let config = ChunkingConfig::from(options).validate()?;
    let mut chunks = Vec::new();
    let mut cursor = 0u64;

    for page in pages {
        let normalized = normalize_page_text(&page.text);
        for text in split_text(&normalized, config) {
            chunks.push(DocumentChunk {
                chunk_id: make_chunk_id(&document.document_id, page.number, cursor, &text),
                document_id: document.document_id.clone(),
                text,
                metadata: ChunkMetadata {
                    source: document.file_name.clone(),
                    page_number: page.number,
                    total_pages: document.page_count,
                    chunk_index: cursor,
                },
            });
            cursor = cursor.saturating_add(1);
        }
    }

    Ok(chunks)
}

fn make_chunk_id(document_id: &str, page: u32, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(page.to_le_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
