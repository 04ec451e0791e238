//! Small fixtures shared by the unit and integration tests across litmap
//! crates: a once-per-process tracing subscriber for `cargo test -- --nocapture`,
//! and an artifact-store scratch directory.

use std::sync::Once;

use tempfile::TempDir;

static INIT_TRACING: Once = Once::new();

/// Installs a `tracing` subscriber the first time it's called in a test
/// binary; subsequent calls are no-ops. Controlled by `RUST_LOG`.
pub fn maybe_start_logging() {
    INIT_TRACING.call_once(|| {
        let _ = dotenvy::dotenv();
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
        let _ = tracing_log::LogTracer::init();
    });
}

/// A scratch directory for a single test, deleted on drop. Used anywhere a
/// test needs a real `litmap_artifacts` directory on disk.
pub struct ScratchDir(TempDir);

impl ScratchDir {
    pub fn new() -> Self {
        Self(tempfile::tempdir().expect("create temp dir"))
    }

    pub fn path(&self) -> &std::path::Path {
        self.0.path()
    }
}

impl Default for ScratchDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Asserts that a `Result` is an `Err` whose `Display` contains `needle`,
/// for tests that only care about the error's user-visible message.
#[macro_export]
macro_rules! assert_error_contains {
    ($result:expr, $needle:expr) => {
        match $result {
            Ok(_) => panic!("expected an error containing {:?}, got Ok", $needle),
            Err(e) => {
                let msg = e.to_string();
                assert!(
                    msg.contains($needle),
                    "expected error message to contain {:?}, got {:?}",
                    $needle,
                    msg
                );
            }
        }
    };
}
