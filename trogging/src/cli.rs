//! `clap`-derived flags shared by every litmap stage binary.

use clap::Parser;

use crate::{LogFormat, TroggingGuard};

#[derive(Debug, Clone, Parser)]
pub struct LoggingConfig {
    /// Log filter directive, e.g. `info` or `litmap_store=debug,info`.
    #[clap(long = "log-filter", env = "LOG_FILTER", default_value = "info")]
    pub log_filter: String,

    /// Log output format.
    #[clap(long = "log-format", env = "LOG_FORMAT", default_value = "logfmt")]
    pub log_format: LogFormatArg,

    /// Optional path to append the execution log to, in addition to
    /// stderr's format.
    #[clap(long = "log-file", env = "LOG_FILE")]
    pub log_file: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatArg {
    Logfmt,
    Json,
}

impl std::str::FromStr for LogFormatArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logfmt" => Ok(Self::Logfmt),
            "json" => Ok(Self::Json),
            other => Err(format!("invalid log format {other:?}, expected logfmt or json")),
        }
    }
}

impl LoggingConfig {
    pub fn build(&self) -> TroggingGuard {
        let format = match self.log_format {
            LogFormatArg::Logfmt => LogFormat::Logfmt,
            LogFormatArg::Json => LogFormat::Json,
        };
        TroggingGuard::new(self.log_filter.clone(), format).with_log_file(self.log_file.clone())
    }
}
