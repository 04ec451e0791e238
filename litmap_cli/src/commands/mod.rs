//! Subcommand dispatch, mirroring the teacher's `commands::run` module:
//! one `Config` per subcommand, composed here into a top-level enum and
//! an aggregated error type.

pub mod embed;
pub mod hierarchy;
pub mod index;
pub mod ingest;
pub mod serve;
pub mod topic;

use thiserror::Error;

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Pull new PubMed article XML into the chunk store (spec C5).
    Ingest(ingest::Config),
    /// Chunk and embed articles into the sentence/complete vector indices (spec C6).
    Embed(embed::Config),
    /// Fit topics over a sliding window of embedded chunks (spec C7).
    Topic(topic::Config),
    /// Consolidate tracked topic slices into a deduped, merged hierarchy (spec C8 + C9).
    Hierarchy(hierarchy::Config),
    /// Write the built hierarchy to the cluster index and assign documents to it (spec C10).
    Index(index::Config),
    /// Serve the `/ask` and `/embed` RAG endpoints (spec C11).
    Serve(serve::Config),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Ingest(#[from] ingest::Error),

    #[error(transparent)]
    Embed(#[from] embed::Error),

    #[error(transparent)]
    Topic(#[from] topic::Error),

    #[error(transparent)]
    Hierarchy(#[from] hierarchy::Error),

    #[error(transparent)]
    Index(#[from] index::Error),

    #[error(transparent)]
    Serve(#[from] serve::Error),
}

impl Command {
    /// The `RunConfig` of whichever subcommand was selected, so `main`
    /// can install logging before dispatching.
    pub fn run_config(&self) -> &cli_blocks::RunConfig {
        match self {
            Command::Ingest(config) => &config.run_config,
            Command::Embed(config) => &config.run_config,
            Command::Topic(config) => &config.run_config,
            Command::Hierarchy(config) => &config.run_config,
            Command::Index(config) => &config.run_config,
            Command::Serve(config) => &config.run_config,
        }
    }
}

pub async fn command(command: Command) -> Result<(), Error> {
    match command {
        Command::Ingest(config) => ingest::command(config).await?,
        Command::Embed(config) => embed::command(config).await?,
        Command::Topic(config) => topic::command(config).await?,
        Command::Hierarchy(config) => hierarchy::command(config).await?,
        Command::Index(config) => index::command(config).await?,
        Command::Serve(config) => serve::command(config).await?,
    }
    Ok(())
}
