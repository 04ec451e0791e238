//! Day-by-day ingest driver (spec C5, §4.5): fetch ids for a date, dedupe
//! against the article index, fetch+parse+upsert the missing ones.

mod orchestrator;

pub use orchestrator::{IngestError, IngestOrchestrator, IngestSummary};
