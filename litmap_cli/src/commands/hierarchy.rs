//! `litmap hierarchy` (spec C8 + C9, §4.8-4.9, §6 `--clusterinformation`).
//!
//! Consolidates every topic-slice artifact `topic` has tracked, dedupes the
//! resulting global topics, and replays the agglomerative merge into a
//! checkpointed [`hierarchy::merge::MergeState`]. `index` picks that
//! checkpoint back up to write the cluster index and assign documents.

use chrono::NaiveDate;
use thiserror::Error;

use crate::clients;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TRACKER_FILE: &str = "topic_slice_paths.txt";
const LLM_PROFILE: &str = "topic_metadata";

#[derive(Debug, Error)]
pub enum Error {
    #[error("client error: {0}")]
    Client(#[from] clients::Error),

    #[error("consolidate error: {0}")]
    Consolidate(#[from] hierarchy::ConsolidateError),

    #[error("merge error: {0}")]
    Merge(#[from] hierarchy::MergeError),

    #[error("artifact error: {0}")]
    Artifact(#[from] litmap_artifacts::Error),

    #[error("built hierarchy violates an invariant: {0}")]
    InvalidHierarchy(String),

    #[error("invalid date {0:?}, expected YYYY-MM-DD: {1}")]
    InvalidDate(String, chrono::ParseError),
}

#[derive(Debug, clap::Parser)]
pub struct Config {
    #[clap(flatten)]
    pub run_config: cli_blocks::RunConfig,

    #[clap(flatten)]
    pub llm_config: cli_blocks::LlmConfig,

    #[clap(flatten)]
    pub ml_services_config: cli_blocks::MlServicesConfig,

    /// Restricts consolidation to topic-slice artifacts whose window
    /// overlaps this range, oldest then newest (`YYYY-MM-DD YYYY-MM-DD`).
    #[clap(long = "clusterinformation", number_of_values = 2, required = true)]
    pub clusterinformation: Vec<String>,
}

pub async fn command(config: Config) -> Result<(), Error> {
    let start = parse_date(&config.clusterinformation[0])?;
    let end = parse_date(&config.clusterinformation[1])?;

    let artifacts = litmap_artifacts::ArtifactStore::new(&config.run_config.artifact_dir);
    let llm = clients::build_llm(&config.llm_config, LLM_PROFILE)?;
    let projector = clients::build_projector(&config.ml_services_config)?;

    let tracked = artifacts.read_lines(TRACKER_FILE)?;
    let in_range: Vec<String> = tracked
        .into_iter()
        .filter(|name| window_overlaps(name, start, end))
        .collect();

    let consolidated = hierarchy::consolidate(&artifacts, llm.as_ref(), &in_range).await?;
    let topics = hierarchy::dedupe(consolidated.topics);
    observability_deps::tracing::info!(topics = topics.len(), "topics consolidated and deduped");

    let merged = hierarchy::build_hierarchy(&artifacts, llm.as_ref(), projector.as_ref(), &topics).await?;
    hierarchy::check_invariants(&merged.clusters).map_err(Error::InvalidHierarchy)?;

    observability_deps::tracing::info!(clusters = merged.clusters.len(), "hierarchy built");
    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| Error::InvalidDate(raw.to_string(), e))
}

/// Topic-slice artifacts are named `slice-{index}-{window_start}-{window_end}.bin`
/// (`topic::TopicOrchestrator::run`); parses the embedded window back out
/// to test it against the requested range.
fn window_overlaps(artifact_name: &str, start: NaiveDate, end: NaiveDate) -> bool {
    match parse_window(artifact_name) {
        Some((window_start, window_end)) => window_end >= start && window_start <= end,
        None => true,
    }
}

fn parse_window(artifact_name: &str) -> Option<(NaiveDate, NaiveDate)> {
    let stripped = artifact_name.strip_prefix("slice-")?.strip_suffix(".bin")?;
    let parts: Vec<&str> = stripped.split('-').collect();
    if parts.len() != 7 {
        return None;
    }
    let window_start = NaiveDate::parse_from_str(&parts[1..4].join("-"), DATE_FORMAT).ok()?;
    let window_end = NaiveDate::parse_from_str(&parts[4..7].join("-"), DATE_FORMAT).ok()?;
    Some((window_start, window_end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_window_embedded_in_an_artifact_name() {
        let window = parse_window("slice-00003-2024-01-01-2024-01-15.bin").unwrap();
        assert_eq!(window, (NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()));
    }

    #[test]
    fn unparseable_names_are_kept_rather_than_silently_dropped() {
        assert!(window_overlaps("not-a-slice-name.bin", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
    }
}
