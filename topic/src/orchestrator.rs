use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use litmap_artifacts::ArtifactStore;
use litmap_store::StoreClient;
use litmap_types::{SliceDocument, SliceTopic, TopicSlice};
use litmap_util::CancellationFlag;
use observability_deps::tracing::{info, warn};
use serde_json::{json, Value};
use thiserror::Error;

use crate::model::{TopicDocumentInput, TopicModel};

const SCROLL_SIZE: usize = 500;
const SCROLL_KEEP_ALIVE: Duration = Duration::from_secs(600);

/// Name of the append-only file tracking produced slice-artifact paths
/// (spec §4.7 "append the artifact path to a persisted list").
const TRACKER_FILE: &str = "topic_slice_paths.txt";

#[derive(Debug, Error)]
pub enum TopicError {
    #[error("store error: {0}")]
    Store(#[from] litmap_store::StoreError),

    #[error("failed to read chunk document: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Model(#[from] crate::model::TopicModelError),

    #[error("artifact error: {0}")]
    Artifact(#[from] litmap_artifacts::Error),
}

#[derive(Debug, Clone, Default)]
pub struct TopicSummary {
    /// One entry per window actually processed (empty windows are skipped).
    pub artifact_paths: Vec<String>,
    pub skipped_empty_windows: usize,
    pub cancelled: bool,
}

/// Drives Stage T (spec C7, §4.7): for each `(start, end)` window, scrolls
/// the chunk index, fits topics via the injected [`TopicModel`], and
/// persists one [`TopicSlice`] artifact per non-empty window.
#[derive(Debug, Clone)]
pub struct TopicOrchestrator {
    store: Arc<dyn StoreClient>,
    model: Arc<dyn TopicModel>,
    artifacts: ArtifactStore,
    chunk_index: String,
}

impl TopicOrchestrator {
    pub fn new(store: Arc<dyn StoreClient>, model: Arc<dyn TopicModel>, artifacts: ArtifactStore, chunk_index: String) -> Self {
        Self {
            store,
            model,
            artifacts,
            chunk_index,
        }
    }

    pub async fn run(
        &self,
        windows: &[(NaiveDate, NaiveDate)],
        cancellation: &CancellationFlag,
    ) -> Result<TopicSummary, TopicError> {
        let mut summary = TopicSummary::default();

        for (index, &(start, end)) in windows.iter().enumerate() {
            if cancellation.is_cancelled() {
                info!("topic discovery cancelled");
                summary.cancelled = true;
                break;
            }

            let documents = self.collect_window(start, end).await?;
            if documents.is_empty() {
                info!(%start, %end, "window has no chunks, skipping");
                summary.skipped_empty_windows += 1;
                continue;
            }

            let fit = self.model.fit(&documents).await?;
            let slice = build_slice(start, end, documents, fit);

            let artifact_name = format!("slice-{index:05}-{start}-{end}.bin");
            self.artifacts.save_artifact(&artifact_name, &slice)?;
            self.artifacts.append_line(TRACKER_FILE, &artifact_name)?;
            summary.artifact_paths.push(artifact_name);

            info!(%start, %end, topics = slice.topics.len(), "topic window complete");
            // `slice` and `documents` drop here before the next window's
            // collection starts (spec §4.7 "memory explicitly released
            // between windows").
        }

        Ok(summary)
    }

    async fn collect_window(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TopicDocumentInput>, TopicError> {
        let query = window_query(start, end);
        let sort = Some(json!([{ "articleDate": "desc" }]));
        let mut page = self.store.search(&self.chunk_index, query, SCROLL_SIZE, sort).await?;

        let mut documents = Vec::new();
        loop {
            for (id, source) in std::mem::take(&mut page.hits) {
                documents.push(parse_chunk_document(id, source)?);
            }

            let Some(cursor) = page.scroll_cursor.clone() else {
                break;
            };
            let next = self.store.scroll(&cursor, SCROLL_KEEP_ALIVE).await?;
            if next.hits.is_empty() {
                self.store.clear_scroll(&cursor).await?;
                break;
            }
            page = next;
        }

        Ok(documents)
    }
}

fn parse_chunk_document(id: String, source: Value) -> Result<TopicDocumentInput, TopicError> {
    let embedding = source["pubmed_bert_vector"]
        .as_array()
        .ok_or_else(|| TopicError::Deserialize(format!("chunk {id} missing embedding")))?
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect();

    let article_date = source["articleDate"]
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .ok_or_else(|| TopicError::Deserialize(format!("chunk {id} missing articleDate")))?;

    let strings = |field: &str| -> Vec<String> {
        source[field]
            .as_array()
            .map(|values| values.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    };

    Ok(TopicDocumentInput {
        document_id: id,
        document: source["text"].as_str().unwrap_or_default().to_string(),
        embedding,
        article_date,
        title: source["title"].as_str().unwrap_or_default().to_string(),
        journal: source["journalTitle"].as_str().unwrap_or_default().to_string(),
        mesh_terms: strings("meshNames"),
        chemicals: strings("chemicals"),
        authors: strings("authorNames"),
    })
}

fn build_slice(
    window_start: NaiveDate,
    window_end: NaiveDate,
    documents: Vec<TopicDocumentInput>,
    fit: crate::model::TopicFit,
) -> TopicSlice {
    if fit.assignments.len() != documents.len() {
        warn!(
            documents = documents.len(),
            assignments = fit.assignments.len(),
            "topic model returned a mismatched assignment count"
        );
    }

    let slice_documents = documents
        .into_iter()
        .zip(fit.assignments.into_iter().chain(std::iter::repeat(SliceTopic::OUTLIER_ID)))
        .map(|(doc, assigned_topic)| SliceDocument {
            document_id: doc.document_id,
            document: doc.document,
            embedding: doc.embedding,
            article_date: doc.article_date,
            title: doc.title,
            journal: doc.journal,
            mesh_terms: doc.mesh_terms,
            chemicals: doc.chemicals,
            authors: doc.authors,
            assigned_topic,
        })
        .collect();

    TopicSlice {
        window_start,
        window_end,
        topics: fit.topics,
        documents: slice_documents,
    }
}

fn window_query(start: NaiveDate, end: NaiveDate) -> Value {
    json!({
        "range": {
            "articleDate": {
                "gte": start.format("%Y-%m-%d").to_string(),
                "lte": end.format("%Y-%m-%d").to_string(),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use litmap_store::{BulkResult, SearchPage, StoreError};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct MockStore {
        page: Mutex<Option<SearchPage>>,
    }

    #[async_trait]
    impl StoreClient for MockStore {
        async fn ensure_index(&self, _index: &str, _mapping: Value) -> Result<(), StoreError> {
            Ok(())
        }
        async fn mget_missing(&self, _index: &str, ids: &[String]) -> Result<Vec<String>, StoreError> {
            Ok(ids.to_vec())
        }
        async fn search(&self, _index: &str, _query: Value, _size: usize, _sort: Option<Value>) -> Result<SearchPage, StoreError> {
            Ok(self.page.lock().unwrap().take().unwrap_or_default())
        }
        async fn scroll(&self, _cursor: &str, _keep_alive: Duration) -> Result<SearchPage, StoreError> {
            Ok(SearchPage::default())
        }
        async fn clear_scroll(&self, _cursor: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn bulk_upsert(&self, _index: &str, _items: Vec<(String, Value)>) -> Result<BulkResult, StoreError> {
            unimplemented!()
        }
        async fn get(&self, _index: &str, _id: &str) -> Result<Option<Value>, StoreError> {
            unimplemented!()
        }
        async fn update(&self, _index: &str, _id: &str, _partial_doc: Value) -> Result<(), StoreError> {
            unimplemented!()
        }
        async fn delete_by_query(&self, _index: &str, _query: Value) -> Result<(), StoreError> {
            unimplemented!()
        }
    }

    #[derive(Debug)]
    struct MockModel;

    #[async_trait]
    impl TopicModel for MockModel {
        async fn fit(&self, documents: &[TopicDocumentInput]) -> Result<crate::model::TopicFit, crate::model::TopicModelError> {
            Ok(crate::model::TopicFit {
                topics: vec![SliceTopic {
                    local_id: 0,
                    words: vec![("gene".to_string(), 0.9)],
                    centroid: vec![0.1; 768],
                }],
                assignments: vec![0; documents.len()],
            })
        }
    }

    fn sample_hit(id: &str) -> (String, Value) {
        (
            id.to_string(),
            json!({
                "text": "some chunk text",
                "pubmed_bert_vector": vec![0.0_f32; 768],
                "articleDate": "2024-01-01",
                "title": "t",
                "journalTitle": "j",
                "meshNames": ["gene"],
                "chemicals": [],
                "authorNames": ["Jane Doe"],
            }),
        )
    }

    #[tokio::test]
    async fn persists_one_artifact_per_non_empty_window() {
        let page = SearchPage {
            hits: vec![sample_hit("1_0")],
            scroll_cursor: Some("cursor".to_string()),
        };
        let store = Arc::new(MockStore {
            page: Mutex::new(Some(page)),
        });
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        let orchestrator = TopicOrchestrator::new(store, Arc::new(MockModel), artifacts.clone(), "chunks".to_string());

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let summary = orchestrator.run(&[(start, end)], &CancellationFlag::new()).await.unwrap();

        assert_eq!(summary.artifact_paths.len(), 1);
        assert_eq!(summary.skipped_empty_windows, 0);

        let slice: TopicSlice = artifacts.load_artifact(&summary.artifact_paths[0]).unwrap();
        assert_eq!(slice.documents.len(), 1);
        assert_eq!(slice.documents[0].assigned_topic, 0);

        let tracked = artifacts.read_lines(TRACKER_FILE).unwrap();
        assert_eq!(tracked, vec![summary.artifact_paths[0].clone()]);
    }

    #[tokio::test]
    async fn empty_windows_are_skipped_without_an_artifact() {
        let store = Arc::new(MockStore::default());
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        let orchestrator = TopicOrchestrator::new(store, Arc::new(MockModel), artifacts, "chunks".to_string());

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let summary = orchestrator.run(&[(start, end)], &CancellationFlag::new()).await.unwrap();

        assert!(summary.artifact_paths.is_empty());
        assert_eq!(summary.skipped_empty_windows, 1);
    }
}
