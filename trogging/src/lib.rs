//! Installs the process-wide `tracing` subscriber for litmap stage
//! binaries: `EnvFilter`-driven level control plus a choice of plain
//! logfmt or JSON output, optionally duplicated to an execution-log file.

#[cfg(feature = "clap")]
pub mod cli;

use std::{
    fs::OpenOptions,
    io,
    path::Path,
};

use observability_deps::tracing::subscriber::set_global_default;
use thiserror::Error;
use tracing_subscriber::{fmt, prelude::*, registry::Registry, EnvFilter};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid log filter directive: {0}")]
    InvalidFilter(#[from] tracing_subscriber::filter::ParseError),

    #[error("could not open execution log file {path}: {source}")]
    LogFile {
        path: String,
        source: io::Error,
    },
}

/// Output encoding for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Logfmt,
    Json,
}

/// Builds and installs the global tracing subscriber. Consumed once per
/// process at stage-binary startup.
#[derive(Debug, Clone)]
pub struct TroggingGuard {
    pub format: LogFormat,
    pub filter: String,
    pub log_file: Option<String>,
}

impl TroggingGuard {
    pub fn new(filter: impl Into<String>, format: LogFormat) -> Self {
        Self {
            format,
            filter: filter.into(),
            log_file: None,
        }
    }

    pub fn with_log_file(mut self, path: Option<impl Into<String>>) -> Self {
        self.log_file = path.map(Into::into);
        self
    }

    /// Installs the subscriber as the process default. Returns an error if
    /// the filter directive is malformed or the execution log file cannot
    /// be opened.
    pub fn install(self) -> Result<(), Error> {
        let env_filter = EnvFilter::try_new(&self.filter)?;

        let subscriber = Registry::default().with(env_filter);

        match (&self.format, &self.log_file) {
            (LogFormat::Logfmt, None) => {
                let layer = fmt::layer().event_format(logfmt::LogFmtFormatter);
                set_global_default(subscriber.with(layer)).ok();
            }
            (LogFormat::Json, None) => {
                let layer = fmt::layer().json();
                set_global_default(subscriber.with(layer)).ok();
            }
            (LogFormat::Logfmt, Some(path)) => {
                let file = open_log_file(path)?;
                let layer = fmt::layer()
                    .event_format(logfmt::LogFmtFormatter)
                    .with_writer(move || file.try_clone().expect("clone log file handle"));
                set_global_default(subscriber.with(layer)).ok();
            }
            (LogFormat::Json, Some(path)) => {
                let file = open_log_file(path)?;
                let layer = fmt::layer()
                    .json()
                    .with_writer(move || file.try_clone().expect("clone log file handle"));
                set_global_default(subscriber.with(layer)).ok();
            }
        }

        tracing_log::LogTracer::init().ok();
        Ok(())
    }
}

fn open_log_file(path: &str) -> Result<std::fs::File, Error> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(Path::new(path))
        .map_err(|source| Error::LogFile {
            path: path.to_string(),
            source,
        })
}
