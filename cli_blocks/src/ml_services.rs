use std::time::Duration;

use clap::Parser;

/// Connection details for the pretrained fitting services behind
/// `topic::TopicModel` and `hierarchy::Projector2D`: the
/// UMAP/HDBSCAN/c-TF-IDF/MMR topic fit and the UMAP-to-2D projection,
/// neither of which has an idiomatic Rust expression.
#[derive(Debug, Clone, Parser)]
pub struct MlServicesConfig {
    #[clap(long = "topic-model-url", env = "LITMAP_TOPIC_MODEL_URL")]
    pub topic_model_url: String,

    #[clap(long = "projector-url", env = "LITMAP_PROJECTOR_URL")]
    pub projector_url: String,

    /// Timeout for a single fit/project request; these run over the full
    /// window's document set so they get a longer budget than a single
    /// store or chat-completion call.
    #[clap(
        long = "ml-services-timeout",
        env = "LITMAP_ML_SERVICES_TIMEOUT",
        default_value = "5m",
        value_parser = humantime::parse_duration,
    )]
    pub timeout: Duration,
}
