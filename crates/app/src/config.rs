use clap::Parser;
use pdf_qa_core::{
    IngestionOptions, ProviderSettings, RetrievalOptions, DEFAULT_CHUNK_OVERLAP,
    DEFAULT_CHUNK_SIZE, DEFAULT_TOP_K,
};
use std::net::SocketAddr;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Parser)]
#[command(name = "pdf-qa-server", version, about = "Upload a PDF and ask questions about it")]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "PDF_QA_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Target chunk size in characters
    #[arg(long, env = "PDF_QA_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Characters shared between neighbouring chunks
    #[arg(long, env = "PDF_QA_CHUNK_OVERLAP", default_value_t = DEFAULT_CHUNK_OVERLAP)]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    #[arg(long, env = "PDF_QA_TOP_K", default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Largest accepted upload in bytes
    #[arg(long, env = "PDF_QA_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,

    /// OpenAI API key; when set, OpenAI serves embeddings and chat
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL", default_value = pdf_qa_core::providers::openai::DEFAULT_OPENAI_BASE_URL)]
    pub openai_base_url: String,

    #[arg(long, env = "OPENAI_CHAT_MODEL", default_value = pdf_qa_core::providers::openai::DEFAULT_OPENAI_CHAT_MODEL)]
    pub openai_chat_model: String,

    #[arg(long, env = "OPENAI_EMBEDDING_MODEL", default_value = pdf_qa_core::providers::openai::DEFAULT_OPENAI_EMBEDDING_MODEL)]
    pub openai_embedding_model: String,

    /// Google AI API key, used when no OpenAI key is set
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    #[arg(long, env = "GOOGLE_CHAT_MODEL", default_value = pdf_qa_core::providers::gemini::DEFAULT_GOOGLE_CHAT_MODEL)]
    pub google_chat_model: String,

    #[arg(long, env = "GOOGLE_EMBEDDING_MODEL", default_value = pdf_qa_core::providers::gemini::DEFAULT_GOOGLE_EMBEDDING_MODEL)]
    pub google_embedding_model: String,
}

impl ServerConfig {
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            openai_api_key: self.openai_api_key.clone(),
            openai_base_url: self.openai_base_url.clone(),
            openai_chat_model: self.openai_chat_model.clone(),
            openai_embedding_model: self.openai_embedding_model.clone(),
            google_api_key: self.google_api_key.clone(),
            google_chat_model: self.google_chat_model.clone(),
            google_embedding_model: self.google_embedding_model.clone(),
        }
    }

    pub fn ingestion_options(&self) -> IngestionOptions {
        IngestionOptions {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
        }
    }

    pub fn retrieval_options(&self) -> RetrievalOptions {
        RetrievalOptions { top_k: self.top_k }
    }
}

#[cfg(test)]
mod tests {
    use super::ServerConfig;
    use clap::Parser;

    #[test]
    fn flags_override_defaults() {
        let config = ServerConfig::try_parse_from([
            "pdf-qa-server",
            "--bind",
            "0.0.0.0:8080",
            "--chunk-size",
            "500",
            "--chunk-overlap",
            "50",
            "--top-k",
            "5",
            "--openai-api-key",
            "sk-test",
        ])
        .expect("valid flags");

        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.ingestion_options().chunk_size, 500);
        assert_eq!(config.ingestion_options().chunk_overlap, 50);
        assert_eq!(config.retrieval_options().top_k, 5);
        assert_eq!(
            config.provider_settings().openai_api_key.as_deref(),
            Some("sk-test")
        );
    }

    #[test]
    fn bad_bind_address_is_rejected() {
        let result = ServerConfig::try_parse_from(["pdf-qa-server", "--bind", "not-an-address"]);
        assert!(result.is_err());
    }
}
