use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("store error: {0}")]
    Store(#[from] litmap_store::StoreError),

    #[error("embedder error: {0}")]
    Embedder(#[from] embed::EmbedderError),

    #[error("llm error: {0}")]
    Llm(#[from] litmap_llm::LlmError),
}

pub struct AppError(RagError);

impl From<litmap_store::StoreError> for AppError {
    fn from(err: litmap_store::StoreError) -> Self {
        Self(RagError::Store(err))
    }
}

impl From<embed::EmbedderError> for AppError {
    fn from(err: embed::EmbedderError) -> Self {
        Self(RagError::Embedder(err))
    }
}

impl From<litmap_llm::LlmError> for AppError {
    fn from(err: litmap_llm::LlmError) -> Self {
        Self(RagError::Llm(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}
