//! `litmap ingest` (spec C5, §4.5, §6 `--range`).

use chrono::NaiveDate;
use dialoguer::Confirm;
use thiserror::Error;

use crate::clients;

const DATE_FORMAT: &str = "%Y/%m/%d";
const EARLIEST_DATE: &str = "1900/01/01";

#[derive(Debug, Error)]
pub enum Error {
    #[error("client error: {0}")]
    Client(#[from] clients::Error),

    #[error("ingest error: {0}")]
    Ingest(#[from] ::ingest::IngestError),

    #[error("--range takes exactly two dates (YYYY/MM/DD), got {0}")]
    InvalidRangeArity(usize),

    #[error("invalid date {0:?}, expected YYYY/MM/DD: {1}")]
    InvalidDate(String, chrono::ParseError),

    #[error("ingest range confirmation declined")]
    Declined,
}

#[derive(Debug, clap::Parser)]
pub struct Config {
    #[clap(flatten)]
    pub run_config: cli_blocks::RunConfig,

    #[clap(flatten)]
    pub store_config: cli_blocks::StoreConfig,

    #[clap(flatten)]
    pub entrez_config: cli_blocks::EntrezConfig,

    /// Inclusive date range to ingest, oldest then newest (`YYYY/MM/DD
    /// YYYY/MM/DD`). Omit to be prompted for the full historical range.
    #[clap(long = "range", min_values = 2, max_values = 2)]
    pub range: Vec<String>,
}

pub async fn command(config: Config) -> Result<(), Error> {
    let (start, end) = resolve_range(&config.range)?;

    let store = clients::build_store(&config.store_config)?;
    let entrez = clients::build_entrez(&config.entrez_config)?;
    let orchestrator = ::ingest::IngestOrchestrator::new(entrez, store, config.store_config.article_index.clone());

    let cancellation = clients::spawn_cancellation_handler();
    let summary = orchestrator.run(start, end, &cancellation).await?;

    let stuck: Vec<&NaiveDate> = summary.stuck_days().collect();
    if stuck.is_empty() {
        observability_deps::tracing::info!(days = summary.days.len(), cancelled = summary.cancelled, "ingest complete");
    } else {
        observability_deps::tracing::warn!(?stuck, "ingest finished with stuck days");
    }

    Ok(())
}

fn resolve_range(range: &[String]) -> Result<(NaiveDate, NaiveDate), Error> {
    match range.len() {
        0 => {
            let today = chrono::Utc::now().date_naive();
            let confirmed = Confirm::new()
                .with_prompt(format!("insert from 1900 to {today}? (y/n)"))
                .default(false)
                .interact()
                .unwrap_or(false);
            if !confirmed {
                return Err(Error::Declined);
            }
            let start = parse_date(EARLIEST_DATE)?;
            Ok((start, today))
        }
        2 => {
            let start = parse_date(&range[0])?;
            let end = parse_date(&range[1])?;
            Ok((start, end))
        }
        n => Err(Error::InvalidRangeArity(n)),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| Error::InvalidDate(raw.to_string(), e))
}
