//! `litmap embed` (spec C6, §4.6, §6 `--vectorcreation`/`--chunking`/`--json_file`).

use chrono::NaiveDate;
use embed::ChunkStrategy;
use thiserror::Error;

use crate::clients;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum Error {
    #[error("client error: {0}")]
    Client(#[from] clients::Error),

    #[error("embed error: {0}")]
    Embed(#[from] embed::EmbedError),

    #[error("invalid date {0:?}, expected YYYY-MM-DD: {1}")]
    InvalidDate(String, chrono::ParseError),

    #[error("--vectorcreation takes exactly two dates (YYYY-MM-DD), got {0}; or pass --json_file")]
    InvalidRangeArity(usize),

    #[error("failed to read id list {path:?}: {source}")]
    IdList { path: String, source: std::io::Error },
}

#[derive(Debug, Clone, Copy, clap::ArgEnum)]
pub enum ChunkingArg {
    Complete,
    Sentence,
}

impl From<ChunkingArg> for ChunkStrategy {
    fn from(arg: ChunkingArg) -> Self {
        match arg {
            ChunkingArg::Complete => ChunkStrategy::Complete,
            ChunkingArg::Sentence => ChunkStrategy::Sentence,
        }
    }
}

#[derive(Debug, clap::Parser)]
pub struct Config {
    #[clap(flatten)]
    pub run_config: cli_blocks::RunConfig,

    #[clap(flatten)]
    pub store_config: cli_blocks::StoreConfig,

    #[clap(flatten)]
    pub llm_config: cli_blocks::LlmConfig,

    /// Inclusive date range to embed, oldest then newest (`YYYY-MM-DD
    /// YYYY-MM-DD`). Ignored when `--json_file` selects id-list mode.
    #[clap(long = "vectorcreation", min_values = 2, max_values = 2)]
    pub vectorcreation: Vec<String>,

    #[clap(long = "chunking", arg_enum, default_value = "complete")]
    pub chunking: ChunkingArg,

    /// Path to a JSON array of article ids to embed directly, bypassing
    /// the date-range scroll.
    #[clap(long = "json_file")]
    pub json_file: Option<String>,
}

pub async fn command(config: Config) -> Result<(), Error> {
    let store = clients::build_store(&config.store_config)?;
    let embedder = clients::build_embedder(&config.llm_config)?;
    let strategy: ChunkStrategy = config.chunking.into();
    let orchestrator = embed::EmbedOrchestrator::new(
        store,
        embedder,
        config.store_config.article_index.clone(),
        chunk_index_for(&config.store_config, strategy),
        strategy,
    );
    let cancellation = clients::spawn_cancellation_handler();

    if let Some(path) = &config.json_file {
        let ids = read_id_list(path)?;
        let summary = orchestrator.run_ids(&ids, &cancellation).await?;
        observability_deps::tracing::info!(chunks_embedded = summary.chunks_embedded, "embed (id-list) complete");
        return Ok(());
    }

    let (start, end) = parse_range(&config.vectorcreation)?;
    let summary = orchestrator.run(start, end, &cancellation).await?;
    observability_deps::tracing::info!(days = summary.days.len(), cancelled = summary.cancelled, "embed complete");
    Ok(())
}

fn chunk_index_for(store_config: &cli_blocks::StoreConfig, strategy: ChunkStrategy) -> String {
    match strategy {
        ChunkStrategy::Complete => store_config.chunk_index_complete.clone(),
        ChunkStrategy::Sentence => store_config.chunk_index_sentence.clone(),
    }
}

fn parse_range(range: &[String]) -> Result<(NaiveDate, NaiveDate), Error> {
    if range.len() != 2 {
        return Err(Error::InvalidRangeArity(range.len()));
    }
    let start = NaiveDate::parse_from_str(&range[0], DATE_FORMAT).map_err(|e| Error::InvalidDate(range[0].clone(), e))?;
    let end = NaiveDate::parse_from_str(&range[1], DATE_FORMAT).map_err(|e| Error::InvalidDate(range[1].clone(), e))?;
    Ok((start, end))
}

fn read_id_list(path: &str) -> Result<Vec<String>, Error> {
    let contents = std::fs::read_to_string(path).map_err(|source| Error::IdList {
        path: path.to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&contents).unwrap_or_else(|_| contents.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect()))
}
