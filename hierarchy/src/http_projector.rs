use std::time::Duration;

use async_trait::async_trait;
use litmap_types::Embedding;
use serde::Deserialize;
use serde_json::json;

use crate::merge::{Projector2D, ProjectorError};

/// Connection details for the pretrained UMAP-to-2D projection service.
/// Like [`topic::HttpTopicModel`], the fit itself has no idiomatic Rust
/// expression, so it runs behind this thin HTTP client.
#[derive(Debug, Clone)]
pub struct HttpProjector2DConfig {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug)]
pub struct HttpProjector2D {
    http: reqwest::Client,
    config: HttpProjector2DConfig,
}

impl HttpProjector2D {
    pub fn new(config: HttpProjector2DConfig) -> Result<Self, ProjectorError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProjectorError(e.to_string()))?;
        Ok(Self { http, config })
    }
}

#[derive(Debug, Deserialize)]
struct ProjectResponse {
    coordinates: Vec<(f32, f32)>,
}

#[async_trait]
impl Projector2D for HttpProjector2D {
    async fn project(&self, centroids: &[Embedding]) -> Result<Vec<(f32, f32)>, ProjectorError> {
        let response = self
            .http
            .post(format!("{}/project", self.config.base_url.trim_end_matches('/')))
            .json(&json!({ "centroids": centroids }))
            .send()
            .await
            .map_err(|e| ProjectorError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProjectorError(format!("projection service returned {}", response.status())));
        }

        let parsed: ProjectResponse = response.json().await.map_err(|e| ProjectorError(e.to_string()))?;
        Ok(parsed.coordinates)
    }
}
