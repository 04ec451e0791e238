use serde::{Deserialize, Serialize};

/// The JSON envelope returned by the topic-metadata and parent-cluster
/// prompts (spec §4.8, §4.9, §6). On JSON parse failure the gateway fills
/// in `error`/`raw_output` and leaves `label`/`description` null rather
/// than failing the calling stage (spec §7 "LLM non-JSON").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMetadataResponse {
    pub label: Option<String>,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl LlmMetadataResponse {
    pub fn ok(label: String, description: String) -> Self {
        Self {
            label: Some(label),
            description: Some(description),
            error: None,
            raw_output: None,
        }
    }

    pub fn parse_failure(error: impl Into<String>, raw_output: impl Into<String>) -> Self {
        Self {
            label: None,
            description: None,
            error: Some(error.into()),
            raw_output: Some(raw_output.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.label.is_none() && self.description.is_none()
    }
}
