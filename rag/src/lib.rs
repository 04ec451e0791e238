//! HTTP surface for retrieval-augmented question answering over the chunk
//! and cluster indices (spec C11, §4.11, §6): `POST /ask` (document- and
//! corpus-specific) and `POST /embed`.

mod ask;
mod embed_handler;
mod error;
mod tokens;

use std::sync::Arc;

use axum::{routing::post, Router};
use embed::Embedder;
use litmap_llm::LlmGateway;
use litmap_store::StoreClient;

pub use error::AppError;

/// Index names and retrieval tuning knobs, independent of whatever
/// CLI/env layer supplies them (spec §6: four index names, plus `D_top`
/// from the design notes' open question).
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub chunk_index: String,
    pub cluster_index: String,
    /// Top-K chunks retrieved for a document-specific question (spec
    /// §4.11 default 10).
    pub document_top_k: usize,
    /// Maximum context window, in tokens, available for the retrieved
    /// chunk text (spec §4.11).
    pub max_context_tokens: usize,
    /// `D_top`: minimum cluster depth returned by a `get_corpus_info`
    /// query. When unset, resolved at query time as `max(depth) - 4`.
    pub top_depth: Option<u32>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_index: "chunks".to_string(),
            cluster_index: "clusters".to_string(),
            document_top_k: 10,
            max_context_tokens: 4096,
            top_depth: None,
        }
    }
}

/// Mockable store/LLM/embedder collaborators plus the service's tuning
/// knobs, injected via [`AppState::new`] so tests can substitute fakes for
/// all three the way every other stage crate's orchestrator does.
pub struct AppState {
    pub store: Arc<dyn StoreClient>,
    pub llm: Arc<dyn LlmGateway>,
    pub embedder: Arc<dyn Embedder>,
    pub config: RagConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn StoreClient>, llm: Arc<dyn LlmGateway>, embedder: Arc<dyn Embedder>, config: RagConfig) -> Self {
        Self {
            store,
            llm,
            embedder,
            config,
        }
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ask", post(ask::ask))
        .route("/embed", post(embed_handler::embed))
        .with_state(state)
}
