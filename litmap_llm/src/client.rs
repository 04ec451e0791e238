use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use litmap_types::{Intent, LlmMetadataResponse};
use observability_deps::tracing::warn;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::LlmError,
    prompts::{
        answer_synthesis_prompt, intent_parser_prompt, parent_cluster_metadata_prompt,
        topic_metadata_prompt,
    },
};

/// Minimum spacing between consecutive calls (spec §4.12: "a ~2-second
/// pause between consecutive calls").
const CALL_SPACING: Duration = Duration::from_secs(2);

#[async_trait]
pub trait LlmGateway: std::fmt::Debug + Send + Sync {
    async fn topic_metadata(&self, keywords: &[String]) -> LlmMetadataResponse;

    async fn parent_cluster_metadata(
        &self,
        left_label: &str,
        left_description: &str,
        right_label: &str,
        right_description: &str,
    ) -> LlmMetadataResponse;

    async fn parse_intent(&self, question: &str) -> Result<Intent, LlmError>;

    async fn answer(&self, user_query: &str, retrieved_data: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug)]
pub struct HttpLlmGateway {
    http: reqwest::Client,
    config: LlmClientConfig,
    last_call: Mutex<Option<Instant>>,
}

impl HttpLlmGateway {
    pub fn new(config: LlmClientConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;
        Ok(Self {
            http,
            config,
            last_call: Mutex::new(None),
        })
    }

    async fn wait_for_spacing(&self) {
        let wait = {
            let mut last_call = self.last_call.lock().unwrap();
            let wait = last_call
                .map(|t| CALL_SPACING.saturating_sub(t.elapsed()))
                .unwrap_or_default();
            *last_call = Some(Instant::now());
            wait
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }

    /// Sends one chat-completions request with deterministic decoding (low
    /// temperature), retrying once on a transient failure and never on a
    /// 4xx (spec §4.12).
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.wait_for_spacing().await;

        match self.complete_once(prompt).await {
            Ok(text) => Ok(text),
            Err(err) if err.is_retriable() => {
                warn!(error = %err, "llm request failed, retrying once");
                self.wait_for_spacing().await;
                self.complete_once(prompt).await
            }
            Err(err) => Err(err),
        }
    }

    async fn complete_once(&self, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "model": self.config.model,
            "temperature": 0.0,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url.trim_end_matches('/')))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ClientError {
                status: status.as_u16(),
                body,
            });
        }
        if !status.is_success() {
            return Err(LlmError::Request(format!("llm returned {status}")));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Request("empty choices array".to_string()))
    }
}

#[async_trait]
impl LlmGateway for HttpLlmGateway {
    async fn topic_metadata(&self, keywords: &[String]) -> LlmMetadataResponse {
        let prompt = topic_metadata_prompt(keywords);
        match self.complete(&prompt).await {
            Ok(text) => parse_metadata_response(&text),
            Err(err) => LlmMetadataResponse::parse_failure(err.to_string(), String::new()),
        }
    }

    async fn parent_cluster_metadata(
        &self,
        left_label: &str,
        left_description: &str,
        right_label: &str,
        right_description: &str,
    ) -> LlmMetadataResponse {
        let prompt = parent_cluster_metadata_prompt(
            left_label,
            left_description,
            right_label,
            right_description,
        );
        match self.complete(&prompt).await {
            Ok(text) => parse_metadata_response(&text),
            Err(err) => LlmMetadataResponse::parse_failure(err.to_string(), String::new()),
        }
    }

    async fn parse_intent(&self, question: &str) -> Result<Intent, LlmError> {
        let prompt = intent_parser_prompt(question);
        let text = self.complete(&prompt).await?;
        let json_span = first_balanced_json(&text)
            .ok_or_else(|| LlmError::Request("no JSON object in intent response".to_string()))?;
        serde_json::from_str(json_span).map_err(|e| LlmError::Request(e.to_string()))
    }

    async fn answer(&self, user_query: &str, retrieved_data: &str) -> Result<String, LlmError> {
        let prompt = answer_synthesis_prompt(user_query, retrieved_data);
        self.complete(&prompt).await
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    label: Option<String>,
    description: Option<String>,
}

fn parse_metadata_response(text: &str) -> LlmMetadataResponse {
    match first_balanced_json(text).map(serde_json::from_str::<RawMetadata>) {
        Some(Ok(raw)) => match (raw.label, raw.description) {
            (Some(label), Some(description)) => LlmMetadataResponse::ok(label, description),
            _ => LlmMetadataResponse::parse_failure("missing label or description", text),
        },
        Some(Err(err)) => LlmMetadataResponse::parse_failure(err.to_string(), text),
        None => LlmMetadataResponse::parse_failure("no JSON object found", text),
    }
}

/// Finds the first balanced `{ … }` span in `text` and returns it as a
/// `&str` slice, tolerating surrounding prose ("Sure, here you go:
/// {...}") and nested braces inside the JSON payload (spec §4.12).
pub fn first_balanced_json(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{')?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_balanced_span_with_surrounding_prose() {
        let text = "Sure, here you go:\n{\"label\": \"gene editing\", \"description\": \"crispr work\"}\nHope that helps.";
        let span = first_balanced_json(text).unwrap();
        assert_eq!(span, "{\"label\": \"gene editing\", \"description\": \"crispr work\"}");
    }

    #[test]
    fn tolerates_nested_braces() {
        let text = "{\"retrieved_data\": {\"a\": 1}, \"label\": \"x\"}";
        let span = first_balanced_json(text).unwrap();
        let value: serde_json::Value = serde_json::from_str(span).unwrap();
        assert_eq!(value["label"], "x");
    }

    #[test]
    fn returns_none_without_braces() {
        assert!(first_balanced_json("no json here").is_none());
    }

    #[test]
    fn metadata_parse_failure_on_missing_fields() {
        let response = parse_metadata_response("{\"label\": \"x\"}");
        assert!(response.is_failure());
        assert!(response.error.is_some());
    }

    #[test]
    fn metadata_parse_success() {
        let response =
            parse_metadata_response("{\"label\": \"gene editing\", \"description\": \"short\"}");
        assert!(!response.is_failure());
        assert_eq!(response.label.as_deref(), Some("gene editing"));
    }
}
