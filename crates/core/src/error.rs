use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("upload is empty")]
    EmptyUpload,

    #[error("upload is not a pdf: {0}")]
    NotPdf(String),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("embedding failed: {0}")]
    Embedding(#[from] ProviderError),

    #[error("indexing failed: {0}")]
    Index(#[from] SearchError),
}

impl IngestError {
    /// Errors caused by what the client sent rather than by a downstream failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, IngestError::EmptyUpload | IngestError::NotPdf(_))
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] ProviderError),

    #[error("embedding count {embeddings} doesn't match chunk count {chunks}")]
    CountMismatch { chunks: usize, embeddings: usize },

    #[error("vector dimension {actual} != {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("search request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} api error: {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to parse {provider} response: {details}")]
    Parse {
        provider: &'static str,
        details: String,
    },

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

#[derive(Debug, Error)]
pub enum QaError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl QaError {
    pub fn is_client_error(&self) -> bool {
        match self {
            QaError::InvalidInput(_) => true,
            QaError::Ingest(error) => error.is_client_error(),
            QaError::Search(_) | QaError::Provider(_) => false,
        }
    }
}

pub type Result<T, E = QaError> = std::result::Result<T, E>;
