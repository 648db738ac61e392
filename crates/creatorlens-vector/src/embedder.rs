//! Embedding backend trait and implementations.
//!
//! The `EmbeddingBackend` trait abstracts over embedding generation.
//! Implementations:
//! - `OpenAiEmbedder`: OpenAI embeddings API (text-embedding-3-small by default)
//! - `NoopEmbedder`: deterministic local vectors for tests and offline mode

use async_trait::async_trait;
use creatorlens_core::{truncate_chars, Error, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Inputs longer than this are truncated before embedding.
const MAX_EMBED_INPUT_CHARS: usize = 8_000;
/// Texts per embeddings API request.
const EMBED_BATCH_SIZE: usize = 100;

/// Trait for embedding backends.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for a batch of texts, one vector per input.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Check if the backend is usable (credentials configured, model loaded).
    fn is_available(&self) -> bool;
}

// -------------------------------------------------------------------
// OpenAI
// -------------------------------------------------------------------

/// OpenAI embeddings over HTTP.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
        }
    }

    async fn embed_batch(&self, batch: &[&str]) -> Result<Vec<Vec<f32>>> {
        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "input": batch,
            }))
            .send()
            .await
            .map_err(|e| Error::Provider(format!("Embeddings request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "Embeddings API error {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Embeddings response parse failed: {}", e)))?;
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for embeddings".to_string(),
            ));
        }

        let mut results = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(EMBED_BATCH_SIZE) {
            let batch: Vec<&str> = chunk
                .iter()
                .map(|t| truncate_chars(t, MAX_EMBED_INPUT_CHARS))
                .collect();
            let vectors = self.embed_batch(&batch).await?;
            debug!("Embedded batch of {} texts", vectors.len());
            results.extend(vectors);
        }
        Ok(results)
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// -------------------------------------------------------------------
// Noop
// -------------------------------------------------------------------

/// Deterministic local embedder. Vectors are derived from byte content,
/// so equal texts map to equal vectors.
pub struct NoopEmbedder {
    dim: usize,
}

impl NoopEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

#[async_trait]
impl EmbeddingBackend for NoopEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut v = vec![0.0f32; self.dim];
                for (i, b) in text.bytes().enumerate() {
                    v[i % self.dim] += b as f32 / 255.0;
                }
                v
            })
            .collect())
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_embedder_is_deterministic() {
        let embedder = NoopEmbedder::new(16);
        let a = embedder.embed(&["hello world".to_string()]).await.unwrap();
        let b = embedder.embed(&["hello world".to_string()]).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 16);
    }
}
