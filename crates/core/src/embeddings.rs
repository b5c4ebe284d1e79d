use crate::error::ProviderError;
use async_trait::async_trait;

const DEFAULT: usize = 128;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

/// Turns text into vectors. Documents and queries are separate calls because
/// some hosted models embed them with different task hints.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// One vector per input, in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    fn name(&self) -> &str;
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Deterministic embedder that needs no network: lowercased character
/// trigrams are hashed into `dimensions` buckets and the counts normalised to
/// unit length. Used when wiring the server without a hosted provider, such as
/// in the endpoint tests.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let buckets = self.dimensions.max(1);
        let mut vector = vec![0f32; buckets];
        let lowered = text.to_lowercase();

        // Byte offsets of every char plus the end, so each window of four
        // offsets spans exactly three chars.
        let offsets = lowered
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(lowered.len()))
            .collect::<Vec<_>>();
        for bounds in offsets.windows(4) {
            let bucket = fnv1a(&lowered[bounds[0]..bounds[3]]) % buckets as u64;
            vector[bucket as usize] += 1.0;
        }

        normalize(&mut vector);
        vector
    }
}

fn fnv1a(token: &str) -> u64 {
    token
        .bytes()
        .fold(FNV_OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME))
}

fn normalize(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        vector.iter_mut().for_each(|value| *value /= magnitude);
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.embed(text))
    }

    fn name(&self) -> &str {
        "char-ngram"
    }
}

/// Cosine similarity; zero when either vector has no magnitude or the lengths differ.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    let mut dot = 0f32;
    let mut left_norm = 0f32;
    let mut right_norm = 0f32;
    for (a, b) in left.iter().zip(right) {
        dot += a * b;
        left_norm += a * a;
        right_norm += b * b;
    }

    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    dot / (left_norm.sqrt() * right_norm.sqrt())
}

#[cfg(test)]
mod tests {
    use super::{cosine_similarity, CharacterNgramEmbedder, Embedder};

    #[test]
    fn embedder_is_deterministic() {
        let embedder = CharacterNgramEmbedder::default();
        let first = embedder.embed("Hydraulic pressure and flow");
        let second = embedder.embed("Hydraulic pressure and flow");
        assert_eq!(first, second);
    }

    #[test]
    fn embedder_outputs_expected_length() {
        let embedder = CharacterNgramEmbedder { dimensions: 32 };
        let vector = embedder.embed("abc");
        assert_eq!(vector.len(), 32);
    }

    #[test]
    fn short_or_empty_text_embeds_to_zero() {
        let embedder = CharacterNgramEmbedder::default();
        assert!(embedder.embed("").iter().all(|value| *value == 0.0));
        assert!(embedder.embed("ab").iter().all(|value| *value == 0.0));
        let norm = embedder.embed("abc").iter().map(|v| v * v).sum::<f32>();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn similar_text_scores_higher_than_unrelated_text() {
        let embedder = CharacterNgramEmbedder::default();
        let query = embedder.embed("hydraulic pump pressure");
        let close = embedder.embed("the hydraulic pump holds pressure");
        let far = embedder.embed("quarterly revenue forecast");
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[tokio::test]
    async fn batch_embedding_keeps_input_order() {
        let embedder = CharacterNgramEmbedder::default();
        let texts = vec!["pump".to_string(), "valve".to_string()];
        let vectors = embedder
            .embed_documents(&texts)
            .await
            .expect("offline embedding cannot fail");
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[1], embedder.embed("valve"));
    }

    #[test]
    fn cosine_similarity_bounds() {
        let a = [1.0, 0.0];
        let b = [0.0, 1.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&a, &[1.0]), 0.0);
    }
}
