use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::model::{TopicDocumentInput, TopicFit, TopicModel, TopicModelError};

/// Connection details for the UMAP/HDBSCAN/c-TF-IDF/MMR fitting service
/// (spec §4.7). The fitting pipeline itself has no idiomatic Rust
/// expression, so it runs behind this thin HTTP client exactly the way
/// [`embed::HttpEmbedder`] and [`litmap_llm::HttpLlmGateway`] front their
/// own external models.
#[derive(Debug, Clone)]
pub struct HttpTopicModelConfig {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug)]
pub struct HttpTopicModel {
    http: reqwest::Client,
    config: HttpTopicModelConfig,
}

impl HttpTopicModel {
    pub fn new(config: HttpTopicModelConfig) -> Result<Self, TopicModelError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TopicModelError::Fit(e.to_string()))?;
        Ok(Self { http, config })
    }
}

#[derive(Debug, Serialize)]
struct FitDocument<'a> {
    document_id: &'a str,
    document: &'a str,
    embedding: &'a [f32],
}

#[derive(Debug, Deserialize)]
struct FitResponse {
    fit: TopicFit,
}

#[async_trait]
impl TopicModel for HttpTopicModel {
    async fn fit(&self, documents: &[TopicDocumentInput]) -> Result<TopicFit, TopicModelError> {
        let payload: Vec<FitDocument> = documents
            .iter()
            .map(|doc| FitDocument {
                document_id: &doc.document_id,
                document: &doc.document,
                embedding: &doc.embedding,
            })
            .collect();

        let response = self
            .http
            .post(format!("{}/fit", self.config.base_url.trim_end_matches('/')))
            .json(&json!({ "documents": payload }))
            .send()
            .await
            .map_err(|e| TopicModelError::Fit(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TopicModelError::Fit(format!("topic fit service returned {}", response.status())));
        }

        let parsed: FitResponse = response.json().await.map_err(|e| TopicModelError::Fit(e.to_string()))?;
        Ok(parsed.fit)
    }
}
