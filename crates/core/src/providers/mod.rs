pub mod gemini;
pub mod openai;

pub use gemini::{GeminiChat, GeminiEmbedder, GoogleConfig};
pub use openai::{OpenAiChat, OpenAiConfig, OpenAiEmbedder};

use crate::chat::ChatModel;
use crate::embeddings::Embedder;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Google,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => f.write_str("openai"),
            ProviderKind::Google => f.write_str("google"),
        }
    }
}

/// Raw provider settings as read from the environment or command line.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_chat_model: String,
    pub openai_embedding_model: String,
    pub google_api_key: Option<String>,
    pub google_chat_model: String,
    pub google_embedding_model: String,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        let google = GoogleConfig::default();
        Self {
            openai_api_key: None,
            openai_base_url: openai::DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_chat_model: openai::DEFAULT_OPENAI_CHAT_MODEL.to_string(),
            openai_embedding_model: openai::DEFAULT_OPENAI_EMBEDDING_MODEL.to_string(),
            google_api_key: None,
            google_chat_model: google.chat_model,
            google_embedding_model: google.embedding_model,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|key| !key.is_empty())
}

/// The embedding and chat backends, chosen once at startup and never switched.
#[derive(Debug, Clone)]
pub enum ProviderSelection {
    OpenAi(OpenAiConfig),
    Google(GoogleConfig),
}

impl ProviderSelection {
    /// OpenAI when a non-empty OpenAI key is present, Google otherwise.
    pub fn from_settings(settings: ProviderSettings) -> Self {
        match non_empty(settings.openai_api_key) {
            Some(api_key) => ProviderSelection::OpenAi(OpenAiConfig {
                api_key,
                base_url: settings.openai_base_url,
                chat_model: settings.openai_chat_model,
                embedding_model: settings.openai_embedding_model,
            }),
            None => ProviderSelection::Google(GoogleConfig {
                api_key: non_empty(settings.google_api_key),
                chat_model: settings.google_chat_model,
                embedding_model: settings.google_embedding_model,
                ..GoogleConfig::default()
            }),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderSelection::OpenAi(_) => ProviderKind::OpenAi,
            ProviderSelection::Google(_) => ProviderKind::Google,
        }
    }

    /// Whether the selected backend has a credential to call with.
    pub fn has_credentials(&self) -> bool {
        match self {
            ProviderSelection::OpenAi(_) => true,
            ProviderSelection::Google(config) => config.api_key.is_some(),
        }
    }

    pub fn build(self) -> Providers {
        let kind = self.kind();
        match self {
            ProviderSelection::OpenAi(config) => Providers {
                kind,
                embedder: Arc::new(OpenAiEmbedder::new(config.clone())),
                chat: Arc::new(OpenAiChat::new(config)),
            },
            ProviderSelection::Google(config) => Providers {
                kind,
                embedder: Arc::new(GeminiEmbedder::new(config.clone())),
                chat: Arc::new(GeminiChat::new(config)),
            },
        }
    }
}

#[derive(Clone)]
pub struct Providers {
    pub kind: ProviderKind,
    pub embedder: Arc<dyn Embedder>,
    pub chat: Arc<dyn ChatModel>,
}
