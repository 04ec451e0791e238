use clap::Parser;
use trogging::cli::LoggingConfig;

use crate::ArtifactConfig;

/// Flags every stage binary carries regardless of which stage it runs:
/// logging plus the on-disk locations shared by all stages.
#[derive(Debug, Clone, Parser)]
pub struct RunConfig {
    #[clap(flatten)]
    pub logging: LoggingConfig,

    #[clap(flatten)]
    pub artifact_config: ArtifactConfig,

    /// Directory model artifacts (topic slices, checkpoints) are read from
    /// and written to.
    #[clap(long = "artifact-dir", env = "LITMAP_ARTIFACT_DIR")]
    pub artifact_dir: String,
}

impl RunConfig {
    /// Logging config with its file-mirroring target resolved: an explicit
    /// `--log-file` wins, otherwise the execution log path named by
    /// `--execution-log-path` (spec §6) is used.
    pub fn resolved_logging(&self) -> LoggingConfig {
        let mut logging = self.logging.clone();
        if logging.log_file.is_none() {
            let path = std::path::Path::new(&self.artifact_config.log_dir).join(&self.artifact_config.execution_log_path);
            logging.log_file = Some(path.to_string_lossy().into_owned());
        }
        logging
    }
}
