use thiserror::Error;

/// A failure to apply one item of a bulk request (spec §4.1: bulk never
/// raises on per-item failure, it returns failing ids with reasons).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemFailure {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection-level failure that is worth one retry (spec §7: "one
    /// retry for transient store/LLM errors").
    #[error("transient store error: {0}")]
    Transient(String),

    /// A store response the client cannot recover from (4xx other than
    /// not-found, malformed response body).
    #[error("permanent store error: {0}")]
    Permanent(String),

    #[error("scroll cursor {0} not found or expired")]
    ScrollExpired(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            StoreError::Transient(err.to_string())
        } else {
            StoreError::Permanent(err.to_string())
        }
    }
}
