use std::time::Duration;

use clap::Parser;

/// Connection details for the external article service (spec §4.3, §6).
#[derive(Debug, Clone, Parser)]
pub struct EntrezConfig {
    #[clap(long = "entrez-base-url", env = "LITMAP_ENTREZ_BASE_URL")]
    pub base_url: String,

    #[clap(long = "entrez-db", env = "LITMAP_ENTREZ_DB", default_value = "pubmed")]
    pub db: String,

    /// Timeout for a single request; spec §5 default is 30s for the
    /// external service.
    #[clap(
        long = "entrez-timeout",
        env = "LITMAP_ENTREZ_TIMEOUT",
        default_value = "30s",
        value_parser = humantime::parse_duration,
    )]
    pub timeout: Duration,
}
