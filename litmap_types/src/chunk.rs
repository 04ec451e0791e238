use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::Embedding;

/// Denormalized article metadata copied onto every chunk so the chunk
/// index can filter/facet without joining back to the article index
/// (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub article_date: NaiveDate,
    pub title: String,
    pub journal_title: String,
    pub mesh_names: Vec<String>,
    pub mesh_ids: Vec<String>,
    pub chemicals: Vec<String>,
    pub keywords: Vec<String>,
    pub author_names: Vec<String>,
    pub author_affiliations: Vec<String>,
    pub source_index: String,
}

/// A logical child of an Article: one span of text and its embedding.
/// Identified by `(article_id, chunk_index)`, 0-based (spec P5: chunk id
/// has the form `{articleId}_{k}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub article_id: String,
    pub chunk_index: u32,
    pub text: String,
    pub embedding: Embedding,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// The store document id: `{articleId}_{chunkIndex}`.
    pub fn id(&self) -> String {
        format!("{}_{}", self.article_id, self.chunk_index)
    }

    /// Parses a chunk id back into `(article_id, chunk_index)`, the
    /// inverse of [`Chunk::id`]. Used by tests asserting P5.
    pub fn parse_id(id: &str) -> Option<(&str, u32)> {
        let (article_id, index) = id.rsplit_once('_')?;
        let index: u32 = index.parse().ok()?;
        Some((article_id, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trips() {
        let chunk = Chunk {
            article_id: "12345".into(),
            chunk_index: 3,
            text: "text".into(),
            embedding: vec![0.0; 768],
            metadata: ChunkMetadata {
                article_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                title: "t".into(),
                journal_title: "j".into(),
                mesh_names: vec![],
                mesh_ids: vec![],
                chemicals: vec![],
                keywords: vec![],
                author_names: vec![],
                author_affiliations: vec![],
                source_index: "articles".into(),
            },
        };

        assert_eq!(chunk.id(), "12345_3");
        assert_eq!(Chunk::parse_id(&chunk.id()), Some(("12345", 3)));
    }
}
