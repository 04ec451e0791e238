//! Re-exports the logging/tracing ecosystem crates used throughout litmap so
//! every crate pulls the same versions without repeating them in each
//! `Cargo.toml`.

pub use tracing;
