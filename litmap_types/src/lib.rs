//! The record types shared by every litmap stage crate: the document model
//! (§3) plus the wire types and LLM response envelopes that cross stage
//! boundaries and must not be duplicated per crate.

pub mod article;
pub mod chunk;
pub mod cluster;
pub mod intent;
pub mod llm;
pub mod topic;
pub mod wire;

pub use article::{
    Affiliation, Author, Chemical, Grant, HistoryEntry, HistoryType, Issue, JournalInfo,
    Keyword, MeshTerm, PublicationType, Article,
};
pub use chunk::{Chunk, ChunkMetadata};
pub use cluster::Cluster;
pub use intent::Intent;
pub use llm::LlmMetadataResponse;
pub use topic::{SliceDocument, SliceTopic, Topic, TopicSlice};
pub use wire::{AskRequest, AskResponse, EmbedRequest, EmbedResponse, QuestionType};

/// Embedding dimensionality used throughout the pipeline (spec §3): chunk
/// vectors, topic centroids, and cluster centroids are all length `D`.
pub const EMBEDDING_DIM: usize = 768;

/// Hard ceiling on the `path` keyword field enforced by the backing store
/// (spec §3, §9 "Path field limits").
pub const MAX_PATH_BYTES: usize = 32_766;

/// A dense embedding vector. A type alias rather than a newtype since every
/// crate that touches it needs slice/ndarray-like access without an extra
/// layer of indirection.
pub type Embedding = Vec<f32>;
