use crate::chat::{ChatMessage, ChatModel, Role};
use crate::embeddings::Embedder;
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

const PROVIDER: &str = "google";
const EMBEDDING_BATCH_SIZE: usize = 100;

pub const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GOOGLE_CHAT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GOOGLE_EMBEDDING_MODEL: &str = "gemini-embedding-001";

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GOOGLE_BASE_URL.to_string(),
            chat_model: DEFAULT_GOOGLE_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_GOOGLE_EMBEDDING_MODEL.to_string(),
        }
    }
}

impl GoogleConfig {
    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("GOOGLE_API_KEY is not set".to_string())
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.base_url.trim_end_matches('/'),
            model,
            method
        )
    }
}

async fn post_json(
    client: &Client,
    url: String,
    api_key: &str,
    body: &Value,
) -> Result<Value, ProviderError> {
    let response = client
        .post(url)
        .header("x-goog-api-key", api_key)
        .json(body)
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

    Ok(response.json().await?)
}

fn parse_error(details: impl Into<String>) -> ProviderError {
    ProviderError::Parse {
        provider: PROVIDER,
        details: details.into(),
    }
}

fn values_to_vector(values: &Value) -> Result<Vec<f32>, ProviderError> {
    values
        .as_array()
        .ok_or_else(|| parse_error("embedding values are not an array"))?
        .iter()
        .map(|value| {
            value
                .as_f64()
                .map(|number| number as f32)
                .ok_or_else(|| parse_error("embedding value is not a number"))
        })
        .collect()
}

pub struct GeminiEmbedder {
    client: Client,
    config: GoogleConfig,
}

impl GeminiEmbedder {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn build_batch_body(model: &str, texts: &[String]) -> Value {
        let requests: Vec<Value> = texts
            .iter()
            .map(|text| {
                json!({
                    "model": format!("models/{model}"),
                    "content": { "parts": [{ "text": text }] },
                    "taskType": "RETRIEVAL_DOCUMENT",
                })
            })
            .collect();
        json!({ "requests": requests })
    }
}

fn parse_batch_embeddings(response: &Value, expected: usize) -> Result<Vec<Vec<f32>>, ProviderError> {
    let embeddings = response
        .get("embeddings")
        .and_then(Value::as_array)
        .ok_or_else(|| parse_error("missing embeddings"))?;

    if embeddings.len() != expected {
        return Err(parse_error(format!(
            "expected {expected} embeddings, got {}",
            embeddings.len()
        )));
    }

    embeddings
        .iter()
        .map(|embedding| values_to_vector(&embedding["values"]))
        .collect()
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let api_key = self.config.api_key()?;
        let url = self
            .config
            .model_url(&self.config.embedding_model, "batchEmbedContents");

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBEDDING_BATCH_SIZE) {
            debug!(model = %self.config.embedding_model, batch = batch.len(), "gemini embedding request");
            let body = Self::build_batch_body(&self.config.embedding_model, batch);
            let response = post_json(&self.client, url.clone(), api_key, &body).await?;
            vectors.extend(parse_batch_embeddings(&response, batch.len())?);
        }
        Ok(vectors)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let api_key = self.config.api_key()?;
        let body = json!({
            "content": { "parts": [{ "text": text }] },
            "taskType": "RETRIEVAL_QUERY",
        });
        let url = self
            .config
            .model_url(&self.config.embedding_model, "embedContent");
        let response = post_json(&self.client, url, api_key, &body).await?;
        values_to_vector(&response["embedding"]["values"])
    }

    fn name(&self) -> &str {
        &self.config.embedding_model
    }
}

pub struct GeminiChat {
    client: Client,
    config: GoogleConfig,
}

impl GeminiChat {
    pub fn new(config: GoogleConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Gemini takes the system prompt as a separate `system_instruction` and
    /// calls the assistant role "model".
    fn build_request_body(messages: &[ChatMessage]) -> Value {
        let system = messages
            .iter()
            .filter(|message| message.role == Role::System)
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let contents: Vec<Value> = messages
            .iter()
            .filter_map(|message| {
                let role = match message.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                    Role::System => return None,
                };
                Some(json!({
                    "role": role,
                    "parts": [{ "text": message.content }],
                }))
            })
            .collect();

        let mut body = json!({ "contents": contents });
        if !system.is_empty() {
            body["system_instruction"] = json!({ "parts": [{ "text": system }] });
        }
        body
    }
}

/// Joins the text parts of the first candidate. A candidate without parts
/// (e.g. stopped for safety) reads as empty text.
fn parse_chat_response(response: &Value) -> Result<String, ProviderError> {
    let candidate = response
        .pointer("/candidates/0")
        .ok_or_else(|| parse_error("missing candidates[0]"))?;

    let text = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default();

    Ok(text)
}

#[async_trait]
impl ChatModel for GeminiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let api_key = self.config.api_key()?;
        let body = Self::build_request_body(messages);
        let url = self
            .config
            .model_url(&self.config.chat_model, "generateContent");

        debug!(model = %self.config.chat_model, "gemini chat request");

        let response = post_json(&self.client, url, api_key, &body).await?;
        parse_chat_response(&response)
    }

    fn name(&self) -> &str {
        &self.config.chat_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_goes_to_system_instruction() {
        let messages = vec![
            ChatMessage::system("You are helpful."),
            ChatMessage::user("Hello"),
        ];
        let body = GeminiChat::build_request_body(&messages);

        assert_eq!(
            body["system_instruction"]["parts"][0]["text"],
            "You are helpful."
        );
        let contents = body["contents"].as_array().expect("contents array");
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "Hello");
    }

    #[test]
    fn request_without_system_has_no_instruction() {
        let body = GeminiChat::build_request_body(&[ChatMessage::user("Hello")]);
        assert!(body.get("system_instruction").is_none());
    }

    #[test]
    fn candidate_parts_are_joined() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Forty " }, { "text": "bar." }] } }]
        });
        assert_eq!(parse_chat_response(&response).expect("parsed"), "Forty bar.");
    }

    #[test]
    fn candidate_without_parts_is_empty() {
        let response = json!({ "candidates": [{ "finishReason": "SAFETY" }] });
        assert_eq!(parse_chat_response(&response).expect("parsed"), "");
    }

    #[test]
    fn batch_body_tags_documents() {
        let body = GeminiEmbedder::build_batch_body(
            "gemini-embedding-001",
            &["a".to_string(), "b".to_string()],
        );
        let requests = body["requests"].as_array().expect("requests array");
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0]["model"], "models/gemini-embedding-001");
        assert_eq!(requests[1]["content"]["parts"][0]["text"], "b");
        assert_eq!(requests[0]["taskType"], "RETRIEVAL_DOCUMENT");
    }

    #[test]
    fn batch_embeddings_are_parsed() {
        let response = json!({ "embeddings": [{ "values": [0.5, 1.0] }, { "values": [1.0, 0.0] }] });
        let vectors = parse_batch_embeddings(&response, 2).expect("two vectors");
        assert_eq!(vectors[0], vec![0.5, 1.0]);
        assert!(parse_batch_embeddings(&response, 3).is_err());
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let chat = GeminiChat::new(GoogleConfig::default());
        let result = chat.complete(&[ChatMessage::user("hi")]).await;
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }
}
