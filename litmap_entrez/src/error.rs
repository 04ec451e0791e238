use thiserror::Error;

#[derive(Debug, Error)]
pub enum EntrezError {
    #[error("request to the article service failed: {0}")]
    Request(String),

    #[error("article service returned an unexpected response: {0}")]
    InvalidResponse(String),

    /// Raised after 3 failed attempts (spec §4.3, §7: "up to 3 attempts per
    /// request with 5-second linear backoff; after 3 failures, raise a
    /// fatal retrieval error").
    #[error("article service request failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl From<reqwest::Error> for EntrezError {
    fn from(err: reqwest::Error) -> Self {
        EntrezError::Request(err.to_string())
    }
}
