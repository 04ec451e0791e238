//! Per-window topic discovery over the chunk index (spec C7, §4.7). The
//! UMAP/HDBSCAN/class-TF-IDF/MMR fitting pipeline is an external
//! collaborator behind [`TopicModel`]; this crate owns windowing, document
//! collection, and artifact persistence.

mod http_model;
mod model;
mod orchestrator;
mod windows;

pub use http_model::{HttpTopicModel, HttpTopicModelConfig};
pub use model::{TopicDocumentInput, TopicFit, TopicModel, TopicModelError};
pub use orchestrator::{TopicError, TopicOrchestrator, TopicSummary};
pub use windows::default_windows;
