use crate::chat::{ChatMessage, ChatModel, Role};
use crate::embeddings::Embedder;
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

const PROVIDER: &str = "openai";
const EMBEDDING_BATCH_SIZE: usize = 512;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_CHAT_MODEL: &str = "gpt-4";
pub const DEFAULT_OPENAI_EMBEDDING_MODEL: &str = "text-embedding-3-large";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            chat_model: DEFAULT_OPENAI_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_OPENAI_EMBEDDING_MODEL.to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

pub struct OpenAiEmbedder {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiEmbedder {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let request = EmbedRequest {
            model: &self.config.embedding_model,
            input: texts,
        };

        let response = self
            .client
            .post(self.config.url("embeddings"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: PROVIDER,
                status,
                body,
            });
        }

        let parsed: EmbedResponse = response.json().await?;
        parse_embeddings(parsed, texts.len())
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedItem>,
}

#[derive(Deserialize)]
struct EmbedItem {
    embedding: Vec<f32>,
    index: usize,
}

fn parse_embeddings(
    mut response: EmbedResponse,
    expected: usize,
) -> Result<Vec<Vec<f32>>, ProviderError> {
    response.data.sort_by_key(|item| item.index);

    if response.data.len() != expected {
        return Err(ProviderError::Parse {
            provider: PROVIDER,
            details: format!(
                "expected {expected} embeddings, got {}",
                response.data.len()
            ),
        });
    }

    Ok(response.data.into_iter().map(|item| item.embedding).collect())
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBEDDING_BATCH_SIZE) {
            debug!(model = %self.config.embedding_model, batch = batch.len(), "openai embedding request");
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| ProviderError::Parse {
            provider: PROVIDER,
            details: "empty embedding response".to_string(),
        })
    }

    fn name(&self) -> &str {
        &self.config.embedding_model
    }
}

pub struct OpenAiChat {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiChat {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn build_request_body(model: &str, messages: &[ChatMessage]) -> Value {
        let api_messages: Vec<Value> = messages
            .iter()
            .map(|message| {
                json!({
                    "role": match message.role {
                        Role::System => "system",
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    "content": message.content,
                })
            })
            .collect();

        json!({
            "model": model,
            "messages": api_messages,
        })
    }
}

/// `content` may legitimately be null (refusals, tool calls); that reads as empty text.
fn parse_chat_response(response: &Value) -> Result<String, ProviderError> {
    let message = response
        .pointer("/choices/0/message")
        .ok_or_else(|| ProviderError::Parse {
            provider: PROVIDER,
            details: "missing choices[0].message".to_string(),
        })?;

    Ok(message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let body = Self::build_request_body(&self.config.chat_model, messages);

        debug!(model = %self.config.chat_model, "openai chat request");

        let response = self
            .client
            .post(self.config.url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: PROVIDER,
                status,
                body,
            });
        }

        let parsed: Value = response.json().await?;
        parse_chat_response(&parsed)
    }

    fn name(&self) -> &str {
        &self.config.chat_model
    }
}
