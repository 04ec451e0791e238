use async_trait::async_trait;
use chrono::NaiveDate;
use litmap_types::{Embedding, SliceTopic};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One chunk collected from a window scroll, in the shape the fitting
/// pipeline needs (spec §4.7's document-info table, pre-fit).
#[derive(Debug, Clone)]
pub struct TopicDocumentInput {
    pub document_id: String,
    pub document: String,
    pub embedding: Embedding,
    pub article_date: NaiveDate,
    pub title: String,
    pub journal: String,
    pub mesh_terms: Vec<String>,
    pub chemicals: Vec<String>,
    pub authors: Vec<String>,
}

#[derive(Debug, Error)]
pub enum TopicModelError {
    #[error("topic model fit failed: {0}")]
    Fit(String),
}

/// Result of fitting one window: the discovered topics and, for each input
/// document (same order as passed to [`TopicModel::fit`]), the local topic
/// id it was assigned (`-1` for the outlier topic).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicFit {
    pub topics: Vec<SliceTopic>,
    pub assignments: Vec<i32>,
}

/// UMAP(50, cosine) → HDBSCAN(min_cluster_size=15, euclidean, EOM) →
/// class-TF-IDF (English stopwords, BM25-weighted, frequent-word
/// reduction) → MMR-reweighted representation (diversity=0.3) (spec §4.7).
/// None of that is idiomatically expressible as hand-rolled Rust; this
/// trait is the seam a real dimensionality-reduction/clustering backend
/// plugs into, mirroring how [`litmap_llm::LlmGateway`] seams out the chat
/// model.
#[async_trait]
pub trait TopicModel: std::fmt::Debug + Send + Sync {
    async fn fit(&self, documents: &[TopicDocumentInput]) -> Result<TopicFit, TopicModelError>;
}
