use clap::Parser;

/// Logging destinations beyond the stderr stream every stage already
/// writes, plus the execution-log path named in spec §6.
#[derive(Debug, Clone, Parser)]
pub struct ArtifactConfig {
    #[clap(long = "log-dir", env = "LITMAP_LOG_DIR")]
    pub log_dir: String,

    #[clap(long = "execution-log-path", env = "LITMAP_EXECUTION_LOG_PATH")]
    pub execution_log_path: String,
}
