pub mod chat;
pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod store;
pub mod traits;

pub use chat::{ChatMessage, ChatModel, Role};
pub use chunking::{build_chunks, normalize_page_text, split_text, ChunkingConfig};
pub use embeddings::{
    cosine_similarity, CharacterNgramEmbedder, Embedder, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{IngestError, ProviderError, QaError, SearchError};
pub use extractor::{looks_like_pdf, ExtractedDocument, LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{digest_bytes, prepare_document, PreparedDocument};
pub use models::{
    Answer, ChunkMetadata, DocumentChunk, DocumentFingerprint,
    IngestionOptions, IngestionOutcome, RetrievalOptions, RetrievalQuery, ScoredChunk,
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_TOP_K,
};
pub use orchestrator::{QaCoordinator, NO_ANSWER};
pub use providers::{
    GeminiChat, GeminiEmbedder, GoogleConfig, OpenAiChat, OpenAiConfig, OpenAiEmbedder,
    ProviderKind, ProviderSelection, ProviderSettings, Providers,
};
pub use store::MemoryVectorStore;
pub use traits::VectorIndex;
