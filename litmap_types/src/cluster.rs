use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::{Embedding, MAX_PATH_BYTES};

/// A node in the binary agglomerative hierarchy built over topics (spec
/// §3, §4.9). Leaves correspond 1:1 to deduped global topics; internal
/// nodes are synthesized by the merge replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub topic_words: BTreeSet<String>,
    pub is_leaf: bool,
    pub depth: u32,
    pub path: String,
    pub x: f32,
    pub y: f32,
    /// Exactly 0 (leaf) or 2 (internal) entries.
    pub children: Vec<String>,
    pub size: u32,
    pub centroid: Embedding,
    pub pairwise_similarity: HashMap<String, f32>,
}

impl Cluster {
    pub fn is_valid_children_count(&self) -> bool {
        if self.is_leaf {
            self.children.is_empty()
        } else {
            self.children.len() == 2
        }
    }

    /// Truncates `path` to at most [`MAX_PATH_BYTES`] bytes, cutting at a
    /// UTF-8 character boundary rather than mid-codepoint (spec B4, §9
    /// "Path field limits" — truncation is a storage concern, so this must
    /// only ever be applied to the value being sent to the store, never to
    /// the in-memory ancestry chain).
    pub fn truncate_path_for_storage(path: &str) -> String {
        if path.len() <= MAX_PATH_BYTES {
            return path.to_string();
        }
        let mut end = MAX_PATH_BYTES;
        while end > 0 && !path.is_char_boundary(end) {
            end -= 1;
        }
        path[..end].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        // 3-byte UTF-8 character, repeated past the limit.
        let path: String = std::iter::repeat('\u{2603}').take(MAX_PATH_BYTES).collect();
        let truncated = Cluster::truncate_path_for_storage(&path);
        assert!(truncated.len() <= MAX_PATH_BYTES);
        assert!(truncated.is_char_boundary(truncated.len()));
    }

    #[test]
    fn short_path_is_unchanged() {
        assert_eq!(Cluster::truncate_path_for_storage("a/b/c"), "a/b/c");
    }
}
