//! `clap`-derived configuration blocks shared across litmap stage binaries,
//! each one `#[clap(flatten)]`-ed into a subcommand's own `Config` struct.

mod run_config;
mod store;
mod entrez;
mod llm;
mod artifact;
mod ml_services;

pub use run_config::RunConfig;
pub use store::StoreConfig;
pub use entrez::EntrezConfig;
pub use llm::{LlmConfig, LlmProfile};
pub use artifact::ArtifactConfig;
pub use ml_services::MlServicesConfig;
