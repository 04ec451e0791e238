//! `litmap index` (spec C10, §4.10, §6 `--clusterinformation`).
//!
//! Picks the checkpoint `litmap hierarchy` leaves behind back up, writes
//! every cluster into the cluster index, repairs `path` for any cluster
//! whose `children`-derived ancestry was incomplete, then assigns every
//! chunk in the requested date range to its nearest leaf topic and
//! projects it to 2D.

use chrono::NaiveDate;
use indexer::{DocumentAssigner, TopicCentroid};
use thiserror::Error;

use crate::clients;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum Error {
    #[error("client error: {0}")]
    Client(#[from] clients::Error),

    #[error("cluster write error: {0}")]
    ClusterWrite(#[from] indexer::ClusterWriteError),

    #[error("path repair error: {0}")]
    PathRepair(#[from] indexer::PathRepairError),

    #[error("document assignment error: {0}")]
    Assignment(#[from] indexer::AssignmentError),

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

    /// Inclusive date range of chunks to assign to a topic and project,
    /// oldest then newest (`YYYY-MM-DD YYYY-MM-DD`).
    #[clap(long = "clusterinformation", number_of_values = 2, required = true)]
    pub clusterinformation: Vec<String>,
}

pub async fn command(config: Config) -> Result<(), Error> {
    let start = parse_date(&config.clusterinformation[0])?;
    let end = parse_date(&config.clusterinformation[1])?;

    let store = clients::build_store(&config.store_config)?;
    let projector = clients::build_projector(&config.ml_services_config)?;
    let artifacts = litmap_artifacts::ArtifactStore::new(&config.run_config.artifact_dir);

    let merged = hierarchy::load_final_state(&artifacts);
    let clusters: Vec<_> = merged.clusters.values().cloned().collect();

    let written = indexer::write_clusters(store.as_ref(), &config.store_config.cluster_index, &clusters).await?;
    observability_deps::tracing::info!(written, total = clusters.len(), "clusters written");

    let repaired = indexer::repair_paths(store.as_ref(), &config.store_config.cluster_index).await?;
    observability_deps::tracing::info!(repaired, "cluster paths repaired");

    let topics: Vec<TopicCentroid> = clusters
        .iter()
        .filter(|cluster| cluster.is_leaf)
        .map(|cluster| TopicCentroid {
            cluster_id: cluster.id.clone(),
            centroid: cluster.centroid.clone(),
        })
        .collect();

    let assigner = DocumentAssigner::new(
        store.as_ref(),
        projector.as_ref(),
        config.store_config.chunk_index_sentence.clone(),
        config.store_config.document_projection_index.clone(),
        &topics,
    );
    let assigned = assigner.run(start, end).await?;
    observability_deps::tracing::info!(assigned, "documents assigned and projected");

    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| Error::InvalidDate(raw.to_string(), e))
}
