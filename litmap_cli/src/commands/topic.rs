//! `litmap topic` (spec C7, §4.7, §6 `--clusterchatbackend`).

use chrono::NaiveDate;
use thiserror::Error;

use crate::clients;

const DATE_FORMAT: &str = "%Y-%m-%d";
const WINDOW_STRIDE_DAYS: u64 = 15;

#[derive(Debug, Error)]
pub enum Error {
    #[error("client error: {0}")]
    Client(#[from] clients::Error),

    #[error("topic discovery error: {0}")]
    Topic(#[from] ::topic::TopicError),

    #[error("invalid date {0:?}, expected YYYY-MM-DD: {1}")]
    InvalidDate(String, chrono::ParseError),
}

#[derive(Debug, clap::Parser)]
pub struct Config {
    #[clap(flatten)]
    pub run_config: cli_blocks::RunConfig,

    #[clap(flatten)]
    pub store_config: cli_blocks::StoreConfig,

    #[clap(flatten)]
    pub ml_services_config: cli_blocks::MlServicesConfig,

    /// Inclusive date range to discover topics over, split into 15-day
    /// windows, oldest then newest (`YYYY-MM-DD YYYY-MM-DD`).
    #[clap(long = "clusterchatbackend", number_of_values = 2, required = true)]
    pub clusterchatbackend: Vec<String>,
}

pub async fn command(config: Config) -> Result<(), Error> {
    let start = parse_date(&config.clusterchatbackend[0])?;
    let end = parse_date(&config.clusterchatbackend[1])?;
    let windows = ::topic::default_windows(start, end, WINDOW_STRIDE_DAYS);

    let store = clients::build_store(&config.store_config)?;
    let model = clients::build_topic_model(&config.ml_services_config)?;
    let artifacts = litmap_artifacts::ArtifactStore::new(&config.run_config.artifact_dir);
    let orchestrator = ::topic::TopicOrchestrator::new(store, model, artifacts, config.store_config.chunk_index_sentence.clone());

    let cancellation = clients::spawn_cancellation_handler();
    let summary = orchestrator.run(&windows, &cancellation).await?;

    observability_deps::tracing::info!(
        artifacts = summary.artifact_paths.len(),
        skipped_empty_windows = summary.skipped_empty_windows,
        cancelled = summary.cancelled,
        "topic discovery complete"
    );
    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| Error::InvalidDate(raw.to_string(), e))
}
