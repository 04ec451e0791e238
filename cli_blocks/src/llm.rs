use std::{collections::HashMap, time::Duration};

use clap::Parser;
use serde::Deserialize;

/// One entry of the `LITMAP_LLM_PROFILES` JSON blob: a named model
/// configuration (spec §6, "JSON blob of LLM model configs keyed by
/// profile").
#[derive(Debug, Clone, Deserialize)]
pub struct LlmProfile {
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// LLM gateway and embedding-model configuration.
#[derive(Debug, Clone, Parser)]
pub struct LlmConfig {
    #[clap(long = "llm-api-key", env = "LITMAP_LLM_API_KEY")]
    pub api_key: String,

    #[clap(long = "embedding-model-id", env = "LITMAP_EMBEDDING_MODEL_ID")]
    pub embedding_model_id: String,

    #[clap(long = "huggingface-auth-token", env = "LITMAP_HUGGINGFACE_AUTH_TOKEN")]
    pub huggingface_auth_token: String,

    /// JSON object mapping a profile name (e.g. `"topic_metadata"`,
    /// `"answer_synthesis"`) to its `LlmProfile`.
    #[clap(long = "llm-profiles", env = "LITMAP_LLM_PROFILES")]
    pub profiles_json: String,

    /// Timeout for a single LLM request; spec §5 default is 60s.
    #[clap(
        long = "llm-timeout",
        env = "LITMAP_LLM_TIMEOUT",
        default_value = "60s",
        value_parser = humantime::parse_duration,
    )]
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn profiles(&self) -> Result<HashMap<String, LlmProfile>, serde_json::Error> {
        serde_json::from_str(&self.profiles_json)
    }

    pub fn profile(&self, name: &str) -> Result<Option<LlmProfile>, serde_json::Error> {
        Ok(self.profiles()?.remove(name))
    }
}
