//! Builds the concrete HTTP-backed collaborators every subcommand needs
//! from the shared `cli_blocks` configuration structs, mirroring the
//! teacher's `make_object_store`/`CatalogDsnConfig::get_catalog` helpers
//! that turn a config struct into a boxed trait object.

use std::sync::Arc;

use cli_blocks::{EntrezConfig as CliEntrezConfig, LlmConfig, MlServicesConfig, StoreConfig};
use embed::{Embedder, EmbedderConfig, HttpEmbedder};
use hierarchy::{HttpProjector2D, HttpProjector2DConfig, Projector2D};
use litmap_entrez::{EntrezClient, EntrezConfig, HttpEntrezClient};
use litmap_llm::{HttpLlmGateway, LlmClientConfig, LlmGateway};
use litmap_store::{HttpStoreClient, StoreClient, StoreClientConfig};
use thiserror::Error;
use topic::{HttpTopicModel, HttpTopicModelConfig, TopicModel};

#[derive(Debug, Error)]
pub enum Error {
    #[error("store client error: {0}")]
    Store(#[from] litmap_store::StoreError),

    #[error("article service client error: {0}")]
    Entrez(#[from] litmap_entrez::EntrezError),

    #[error("embedder client error: {0}")]
    Embedder(#[from] embed::EmbedderError),

    #[error("llm gateway client error: {0}")]
    Llm(#[from] litmap_llm::LlmError),

    #[error("hierarchy projector client error: {0}")]
    Projector(#[from] hierarchy::ProjectorError),

    #[error("topic model client error: {0}")]
    TopicModel(#[from] topic::TopicModelError),

    #[error("llm profile {0:?} not found in LITMAP_LLM_PROFILES")]
    MissingLlmProfile(String),

    #[error("invalid LITMAP_LLM_PROFILES JSON: {0}")]
    LlmProfiles(#[from] serde_json::Error),
}

pub fn build_store(config: &StoreConfig) -> Result<Arc<dyn StoreClient>, Error> {
    let client = HttpStoreClient::new(StoreClientConfig {
        base_url: config.base_url(),
        username: config.username.clone(),
        password: config.password.clone(),
        timeout: config.timeout,
    })?;
    Ok(Arc::new(client))
}

pub fn build_entrez(config: &CliEntrezConfig) -> Result<Arc<dyn EntrezClient>, Error> {
    let client = HttpEntrezClient::new(EntrezConfig {
        base_url: config.base_url.clone(),
        db: config.db.clone(),
        timeout: config.timeout,
    })?;
    Ok(Arc::new(client))
}

pub fn build_embedder(config: &LlmConfig) -> Result<Arc<dyn Embedder>, Error> {
    let profile = config
        .profile("embedding")?
        .ok_or_else(|| Error::MissingLlmProfile("embedding".to_string()))?;
    let client = HttpEmbedder::new(EmbedderConfig {
        base_url: profile.base_url,
        api_key: config.huggingface_auth_token.clone(),
        model: config.embedding_model_id.clone(),
        timeout: config.timeout,
    })?;
    Ok(Arc::new(client))
}

/// Builds the LLM gateway used for a subcommand from a single named
/// profile. `HttpLlmGateway` carries one base url/model pair per instance,
/// so a subcommand that needs more than one prompt template (hierarchy's
/// topic metadata and parent-cluster metadata, or rag's intent parsing and
/// answer synthesis) runs both through whichever profile is passed here.
pub fn build_llm(config: &LlmConfig, profile_name: &str) -> Result<Arc<dyn LlmGateway>, Error> {
    let profile = config
        .profile(profile_name)?
        .ok_or_else(|| Error::MissingLlmProfile(profile_name.to_string()))?;
    let client = HttpLlmGateway::new(LlmClientConfig {
        base_url: profile.base_url,
        api_key: config.api_key.clone(),
        model: profile.model,
        timeout: config.timeout,
    })?;
    Ok(Arc::new(client))
}

pub fn build_topic_model(config: &MlServicesConfig) -> Result<Arc<dyn TopicModel>, Error> {
    let client = HttpTopicModel::new(HttpTopicModelConfig {
        base_url: config.topic_model_url.clone(),
        timeout: config.timeout,
    })?;
    Ok(Arc::new(client))
}

pub fn build_projector(config: &MlServicesConfig) -> Result<Arc<dyn Projector2D>, Error> {
    let client = HttpProjector2D::new(HttpProjector2DConfig {
        base_url: config.projector_url.clone(),
        timeout: config.timeout,
    })?;
    Ok(Arc::new(client))
}

/// `tokio::signal::ctrl_c` wired to a cooperative [`litmap_util::CancellationFlag`]
/// (spec §5 "cancellation & timeouts"), spawned once per subcommand run.
pub fn spawn_cancellation_handler() -> Arc<litmap_util::CancellationFlag> {
    let flag = Arc::new(litmap_util::CancellationFlag::new());
    let handler_flag = Arc::clone(&flag);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            observability_deps::tracing::warn!("received ctrl-c, cancelling after the current batch");
            handler_flag.cancel();
        }
    });
    flag
}
