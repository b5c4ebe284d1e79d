use crate::embeddings::{cosine_similarity, Embedder};
use crate::models::{DocumentChunk, RetrievalQuery, ScoredChunk};
use crate::traits::VectorIndex;
use crate::SearchError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

struct StoredChunk {
    chunk: DocumentChunk,
    embedding: Vec<f32>,
}

/// Process-lifetime vector store scanned linearly by cosine similarity.
///
/// Embedding happens before the write lock is taken, so a slow provider never
/// blocks readers, and an upload becomes visible all at once.
pub struct MemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<StoredChunk>>,
}

impl MemoryVectorStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorStore {
    async fn add_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<usize, SearchError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts = chunks
            .iter()
            .map(|chunk| chunk.text.clone())
            .collect::<Vec<_>>();
        let embeddings = self.embedder.embed_documents(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(SearchError::CountMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }

        let mut entries = self.entries.write().await;
        let expected = entries
            .first()
            .map(|entry| entry.embedding.len())
            .or_else(|| embeddings.first().map(Vec::len))
            .unwrap_or_default();
        if let Some(bad) = embeddings.iter().find(|vector| vector.len() != expected) {
            return Err(SearchError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }

        let added = chunks.len();
        entries.extend(
            chunks
                .into_iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| StoredChunk { chunk, embedding }),
        );
        debug!(added, total = entries.len(), "chunks stored");

        Ok(added)
    }

    async fn similarity_search(
        &self,
        query: &RetrievalQuery,
    ) -> Result<Vec<ScoredChunk>, SearchError> {
        if query.top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_query(&query.text).await?;
        let entries = self.entries.read().await;

        if let Some(first) = entries.first() {
            if first.embedding.len() != query_vector.len() {
                return Err(SearchError::DimensionMismatch {
                    expected: first.embedding.len(),
                    actual: query_vector.len(),
                });
            }
        }

        let mut scored = entries
            .iter()
            .map(|entry| ScoredChunk {
                score: cosine_similarity(&query_vector, &entry.embedding),
                chunk: entry.chunk.clone(),
            })
            .collect::<Vec<_>>();

        scored.sort_by(|left, right| right.score.total_cmp(&left.score));
        scored.truncate(query.top_k);
        Ok(scored)
    }

    async fn chunk_count(&self) -> usize {
        self.entries.read().await.len()
    }
}
