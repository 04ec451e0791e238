use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Embedding;

/// A scored keyword in a topic's word list.
pub type WordScore = (String, f32);

/// One topic as discovered within a single time-slice, before global-id
/// assignment and dedupe (spec §4.7). `local_id = -1` is the outlier
/// topic HDBSCAN always produces and that Stage H1 skips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceTopic {
    pub local_id: i32,
    pub words: Vec<WordScore>,
    pub centroid: Embedding,
}

impl SliceTopic {
    pub const OUTLIER_ID: i32 = -1;

    pub fn is_outlier(&self) -> bool {
        self.local_id == Self::OUTLIER_ID
    }
}

/// One row of a slice's document-info table (spec §4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceDocument {
    pub document_id: String,
    pub document: String,
    pub embedding: Embedding,
    pub article_date: NaiveDate,
    pub title: String,
    pub journal: String,
    pub mesh_terms: Vec<String>,
    pub chemicals: Vec<String>,
    pub authors: Vec<String>,
    pub assigned_topic: i32,
}

/// A per-window fitted topic model: the topics it discovered plus the
/// document-info table tying chunks to local topic ids. Persisted as one
/// opaque artifact per window (spec §3, §4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSlice {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub topics: Vec<SliceTopic>,
    pub documents: Vec<SliceDocument>,
}

/// A global topic, after Stage H1 has assigned it a monotone global id and
/// synthesized its label/description via the LLM gateway (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub words: Vec<WordScore>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub centroid: Embedding,
}

impl Topic {
    /// `label` must be at most 3 words with no punctuation (spec §3).
    pub fn label_is_valid(label: &str) -> bool {
        label.split_whitespace().count() <= 3
            && label
                .chars()
                .all(|c| c.is_alphanumeric() || c.is_whitespace() || c == '-')
    }

    /// `description` must be at most 15 words (spec §3).
    pub fn description_is_valid(description: &str) -> bool {
        description.split_whitespace().count() <= 15
    }

    pub fn word_set(&self) -> BTreeSet<&str> {
        self.words.iter().map(|(w, _)| w.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_validity() {
        assert!(Topic::label_is_valid("gene editing"));
        assert!(Topic::label_is_valid("CRISPR-Cas9 therapy"));
        assert!(!Topic::label_is_valid("one two three four"));
        assert!(!Topic::label_is_valid("gene, editing"));
    }

    #[test]
    fn description_validity() {
        let ok = "a short description of this topic area in biomedical research";
        assert_eq!(ok.split_whitespace().count(), 12);
        assert!(Topic::description_is_valid(ok));

        let too_long = "one two three four five six seven eight nine ten eleven twelve thirteen fourteen fifteen sixteen";
        assert!(!Topic::description_is_valid(too_long));
    }
}
