use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request failed: {0}")]
    Request(String),

    /// A 4xx response; spec §4.12 forbids retrying these.
    #[error("llm rejected the request ({status}): {body}")]
    ClientError { status: u16, body: String },
}

impl LlmError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, LlmError::Request(_))
    }
}
