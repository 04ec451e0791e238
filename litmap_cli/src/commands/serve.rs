//! `litmap serve` (spec C11, §4.11, §6 wire protocol): binds the `/ask`
//! and `/embed` HTTP endpoints.

use std::sync::Arc;

use thiserror::Error;

use crate::clients;

const LLM_PROFILE: &str = "answer_synthesis";

#[derive(Debug, Error)]
pub enum Error {
    #[error("client error: {0}")]
    Client(#[from] clients::Error),

    #[error("invalid bind address {0:?}: {1}")]
    InvalidBindAddress(String, std::net::AddrParseError),

    #[error("failed to bind {0}: {1}")]
    Bind(std::net::SocketAddr, std::io::Error),

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

#[derive(Debug, clap::Parser)]
pub struct Config {
    #[clap(flatten)]
    pub run_config: cli_blocks::RunConfig,

    #[clap(flatten)]
    pub store_config: cli_blocks::StoreConfig,

    #[clap(flatten)]
    pub llm_config: cli_blocks::LlmConfig,

    #[clap(long = "bind-address", env = "LITMAP_RAG_BIND_ADDRESS", default_value = "0.0.0.0:8090")]
    pub bind_address: String,

    /// Top-K chunks retrieved for document-specific questions (spec §4.11).
    #[clap(long = "document-top-k", default_value_t = 10)]
    pub document_top_k: usize,

    /// Context-window ceiling (in tokens) for the answer-synthesis prompt.
    #[clap(long = "max-context-tokens", default_value_t = 4096)]
    pub max_context_tokens: usize,

    /// Minimum cluster depth returned by the corpus-info intent; defaults
    /// at runtime to `max(depth) - 4` when not set (spec §9, O-resolution).
    #[clap(long = "top-depth")]
    pub top_depth: Option<u32>,
}

pub async fn command(config: Config) -> Result<(), Error> {
    let store = clients::build_store(&config.store_config)?;
    let llm = clients::build_llm(&config.llm_config, LLM_PROFILE)?;
    let embedder = clients::build_embedder(&config.llm_config)?;

    let rag_config = rag::RagConfig {
        chunk_index: config.store_config.chunk_index_sentence.clone(),
        cluster_index: config.store_config.cluster_index.clone(),
        document_top_k: config.document_top_k,
        max_context_tokens: config.max_context_tokens,
        top_depth: config.top_depth,
    };
    let state = Arc::new(rag::AppState::new(store, llm, embedder, rag_config));
    let router = rag::create_router(state);

    let addr: std::net::SocketAddr = config.bind_address.parse().map_err(|e| Error::InvalidBindAddress(config.bind_address.clone(), e))?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| Error::Bind(addr, e))?;
    observability_deps::tracing::info!(%addr, "rag service listening");

    axum::serve(listener, router).await.map_err(Error::Serve)
}
