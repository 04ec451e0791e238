use std::time::Duration;

use async_trait::async_trait;
use litmap_types::{Embedding, EMBEDDING_DIM};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbedderError {
    #[error("embedding request failed: {0}")]
    Request(String),

    #[error("embedding response had {got} dimensions, expected {EMBEDDING_DIM}")]
    WrongDimension { got: usize },
}

impl From<reqwest::Error> for EmbedderError {
    fn from(err: reqwest::Error) -> Self {
        EmbedderError::Request(err.to_string())
    }
}

/// Computes a length-`D` embedding for one chunk of text (spec §3, §4.6).
/// The model itself is an external collaborator; this crate only owns the
/// call shape and the resulting vector's dimensionality check.
#[async_trait]
pub trait Embedder: std::fmt::Debug + Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedderError>;
}

#[derive(Debug, Clone)]
pub struct EmbedderConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

/// An OpenAI-compatible `/embeddings` client.
#[derive(Debug)]
pub struct HttpEmbedder {
    http: reqwest::Client,
    config: EmbedderConfig,
}

impl HttpEmbedder {
    pub fn new(config: EmbedderConfig) -> Result<Self, EmbedderError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(EmbedderError::from)?;
        Ok(Self { http, config })
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedderError> {
        let body = json!({ "model": self.config.model, "input": text });

        let response = self
            .http
            .post(format!("{}/embeddings", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EmbedderError::Request(format!(
                "embedding endpoint returned {}",
                response.status()
            )));
        }

        let mut parsed: EmbeddingResponse = response.json().await?;
        let vector = parsed
            .data
            .pop()
            .map(|item| item.embedding)
            .ok_or_else(|| EmbedderError::Request("empty embeddings response".to_string()))?;

        if vector.len() != EMBEDDING_DIM {
            return Err(EmbedderError::WrongDimension { got: vector.len() });
        }
        Ok(vector)
    }
}
