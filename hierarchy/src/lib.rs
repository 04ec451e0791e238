//! Topic consolidation and dedupe (spec C8, §4.8) plus the agglomerative
//! hierarchy build that turns deduped topics into a binary cluster tree
//! (spec C9, §4.9).

pub mod consolidate;
mod http_projector;
pub mod merge;
mod similarity;

pub use consolidate::{consolidate, dedupe, ConsolidateError, ConsolidateState};
pub use http_projector::{HttpProjector2D, HttpProjector2DConfig};
pub use merge::{
    agglomerative_average_linkage, build_hierarchy, check_invariants, load_final_state, MergeError, MergeState, Projector2D,
    ProjectorError,
};
pub use similarity::cosine_similarity;
