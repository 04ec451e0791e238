//! Scroll the article index, chunk each usable abstract, embed the chunks,
//! bulk upsert into the chunk index (spec C6, §4.6).

mod chunker;
mod embedder;
mod orchestrator;

pub use chunker::{chunk_complete, chunk_sentence, ChunkStrategy};
pub use embedder::{Embedder, EmbedderConfig, EmbedderError, HttpEmbedder};
pub use orchestrator::{DaySummary, EmbedError, EmbedOrchestrator, EmbedSummary};
