use crate::chat::ChatModel;
use crate::chunking::ChunkingConfig;
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::ingest::prepare_document;
use crate::prompt::{build_context, render_prompt};
use crate::providers::Providers;
use crate::store::MemoryVectorStore;
use crate::traits::VectorIndex;
use crate::{
    Answer, IngestError, IngestionOptions, IngestionOutcome, QaError, RetrievalOptions,
    RetrievalQuery,
};
use std::sync::Arc;
use tracing::info;

pub const NO_ANSWER: &str = "No answer generated";

/// Sequences ingestion (extract, split, embed, store) and question answering
/// (retrieve, prompt, complete) over injected collaborators.
pub struct QaCoordinator {
    index: Arc<dyn VectorIndex>,
    chat: Arc<dyn ChatModel>,
    extractor: Arc<dyn PdfExtractor>,
    ingestion: IngestionOptions,
    retrieval: RetrievalOptions,
}

impl QaCoordinator {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        chat: Arc<dyn ChatModel>,
        extractor: Arc<dyn PdfExtractor>,
        ingestion: IngestionOptions,
        retrieval: RetrievalOptions,
    ) -> Result<Self, IngestError> {
        ChunkingConfig::from(&ingestion).validate()?;
        Ok(Self {
            index,
            chat,
            extractor,
            ingestion,
            retrieval,
        })
    }

    /// Wires a fresh in-memory store and the lopdf extractor to the selected providers.
    pub fn from_providers(
        providers: Providers,
        ingestion: IngestionOptions,
        retrieval: RetrievalOptions,
    ) -> Result<Self, IngestError> {
        let store = MemoryVectorStore::new(providers.embedder);
        Self::new(
            Arc::new(store),
            providers.chat,
            Arc::new(LopdfExtractor),
            ingestion,
            retrieval,
        )
    }

    pub async fn ingest(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestionOutcome, QaError> {
        let extractor = Arc::clone(&self.extractor);
        let options = self.ingestion.clone();
        let name = file_name.to_string();

        let prepared = tokio::task::spawn_blocking(move || {
            prepare_document(&name, &bytes, extractor.as_ref(), &options)
        })
        .await
        .map_err(IngestError::from)??;

        let document = prepared.fingerprint;
        let chunk_count = self
            .index
            .add_chunks(prepared.chunks)
            .await
            .map_err(IngestError::from)?;
        let total_chunks = self.index.chunk_count().await;

        info!(
            file = %document.file_name,
            document_id = %document.document_id,
            pages = document.page_count,
            chunk_count,
            total_chunks,
            "pdf ingested"
        );

        Ok(IngestionOutcome {
            document,
            chunk_count,
            total_chunks,
        })
    }

    pub async fn answer(&self, question: &str) -> Result<Answer, QaError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QaError::InvalidInput("Query is required".to_string()));
        }

        let hits = self
            .index
            .similarity_search(&RetrievalQuery {
                text: question.to_string(),
                top_k: self.retrieval.top_k,
            })
            .await?;

        let context = build_context(&hits);
        let messages = render_prompt(&context, question);
        let reply = self.chat.complete(&messages).await?;

        info!(
            retrieved = hits.len(),
            model = %self.chat.name(),
            answer_chars = reply.len(),
            "question answered"
        );

        let text = if reply.trim().is_empty() {
            NO_ANSWER.to_string()
        } else {
            reply
        };

        Ok(Answer {
            text,
            sources: hits,
        })
    }

    pub async fn chunk_count(&self) -> usize {
        self.index.chunk_count().await
    }
}
