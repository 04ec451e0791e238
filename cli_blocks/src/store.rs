use std::time::Duration;

use clap::Parser;

/// Connection details for the document/vector store plus the four index
/// names every stage reads or writes by name (spec §6).
#[derive(Debug, Clone, Parser)]
pub struct StoreConfig {
    #[clap(long = "store-host", env = "LITMAP_STORE_HOST")]
    pub host: String,

    #[clap(long = "store-port", env = "LITMAP_STORE_PORT", default_value_t = 9200)]
    pub port: u16,

    #[clap(long = "store-username", env = "LITMAP_STORE_USERNAME")]
    pub username: String,

    #[clap(long = "store-password", env = "LITMAP_STORE_PASSWORD")]
    pub password: String,

    #[clap(long = "store-use-tls", env = "LITMAP_STORE_USE_TLS")]
    pub use_tls: bool,

    #[clap(long = "article-index", env = "LITMAP_ARTICLE_INDEX")]
    pub article_index: String,

    #[clap(long = "chunk-index-complete", env = "LITMAP_CHUNK_INDEX_COMPLETE")]
    pub chunk_index_complete: String,

    #[clap(long = "chunk-index-sentence", env = "LITMAP_CHUNK_INDEX_SENTENCE")]
    pub chunk_index_sentence: String,

    #[clap(long = "cluster-index", env = "LITMAP_CLUSTER_INDEX")]
    pub cluster_index: String,

    #[clap(long = "document-projection-index", env = "LITMAP_DOCUMENT_PROJECTION_INDEX")]
    pub document_projection_index: String,

    /// Timeout for a single store request; spec §5 default is 10s for store
    /// reads.
    #[clap(
        long = "store-timeout",
        env = "LITMAP_STORE_TIMEOUT",
        default_value = "10s",
        value_parser = humantime::parse_duration,
    )]
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}
