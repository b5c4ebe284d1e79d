use crate::{DocumentChunk, RetrievalQuery, ScoredChunk, SearchError};
use async_trait::async_trait;

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Embeds and appends `chunks`, returning how many were added.
    async fn add_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<usize, SearchError>;

    async fn similarity_search(
        &self,
        query: &RetrievalQuery,
    ) -> Result<Vec<ScoredChunk>, SearchError>;

    async fn chunk_count(&self) -> usize;
}
