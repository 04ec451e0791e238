use std::time::Duration;

use chrono::NaiveDate;
use hierarchy::{cosine_similarity, Projector2D};
use litmap_store::{mapping::document_projection_index_body, StoreClient};
use litmap_types::Embedding;
use observability_deps::tracing::warn;
use serde_json::{json, Value};
use thiserror::Error;

const SCROLL_SIZE: usize = 500;
const SCROLL_KEEP_ALIVE: Duration = Duration::from_secs(600);
const PROJECTION_SUB_BATCH: usize = 500;
const UPSERT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("store error: {0}")]
    Store(#[from] litmap_store::StoreError),

    #[error("chunk document {0} is missing a required field")]
    Deserialize(String),
}

/// A deduped topic's id and centroid, used as the argmax target for
/// cosine-similarity topic assignment (spec §4.10 "Document assignment").
#[derive(Debug, Clone)]
pub struct TopicCentroid {
    pub cluster_id: String,
    pub centroid: Embedding,
}

#[derive(Debug, Clone)]
struct ChunkRow {
    document_id: String,
    text: String,
    embedding: Embedding,
    article_date: NaiveDate,
    title: String,
    journal: String,
    mesh_terms: Vec<String>,
    chemicals: Vec<String>,
    keywords: Vec<String>,
    authors: Vec<String>,
}

/// Stage X's document-assignment half (spec §4.10): scrolls the chunk
/// index, assigns each chunk the topic centroid it is cosine-nearest to,
/// projects its embedding to 2D in sub-batches through the pretrained
/// projector (substituting `(0, 0)` and logging on a sub-batch failure),
/// and bulk upserts into the document-projection index.
pub struct DocumentAssigner<'a> {
    store: &'a dyn StoreClient,
    projector: &'a dyn Projector2D,
    chunk_index: String,
    document_index: String,
    topics: &'a [TopicCentroid],
}

impl<'a> DocumentAssigner<'a> {
    pub fn new(
        store: &'a dyn StoreClient,
        projector: &'a dyn Projector2D,
        chunk_index: String,
        document_index: String,
        topics: &'a [TopicCentroid],
    ) -> Self {
        Self {
            store,
            projector,
            chunk_index,
            document_index,
            topics,
        }
    }

    pub async fn run(&self, start: NaiveDate, end: NaiveDate) -> Result<usize, AssignmentError> {
        self.store.ensure_index(&self.document_index, document_projection_index_body()).await?;

        let query = date_range_query(start, end);
        let mut page = self.store.search(&self.chunk_index, query, SCROLL_SIZE, None).await?;

        let mut pending = Vec::new();
        let mut assigned = 0;
        loop {
            for (id, source) in std::mem::take(&mut page.hits) {
                pending.push(parse_chunk(id, source)?);
            }

            if pending.len() >= UPSERT_BATCH_SIZE {
                assigned += self.flush(&mut pending).await?;
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
        assigned += self.flush(&mut pending).await?;

        Ok(assigned)
    }

    async fn flush(&self, pending: &mut Vec<ChunkRow>) -> Result<usize, AssignmentError> {
        if pending.is_empty() {
            return Ok(0);
        }
        let batch = std::mem::take(pending);
        let cluster_ids = assign_topics(&batch, self.topics);
        let coordinates = self.project_in_sub_batches(&batch).await;

        let documents: Vec<(String, Value)> = batch
            .iter()
            .zip(cluster_ids)
            .zip(coordinates)
            .map(|((chunk, cluster_id), (x, y))| (chunk.document_id.clone(), document_projection_doc(chunk, &cluster_id, x, y)))
            .collect();

        let count = documents.len();
        let result = self.store.bulk_upsert(&self.document_index, documents).await?;
        for failure in &result.failures {
            warn!(document = %failure.id, reason = %failure.reason, "document projection write failed");
        }
        Ok(count - result.failures.len())
    }

    async fn project_in_sub_batches(&self, batch: &[ChunkRow]) -> Vec<(f32, f32)> {
        let mut coordinates = Vec::with_capacity(batch.len());
        for sub_batch in batch.chunks(PROJECTION_SUB_BATCH) {
            let embeddings: Vec<Embedding> = sub_batch.iter().map(|chunk| chunk.embedding.clone()).collect();
            match self.projector.project(&embeddings).await {
                Ok(points) => coordinates.extend(points),
                Err(err) => {
                    warn!(error = %err, "2D projection sub-batch failed, substituting (0, 0)");
                    coordinates.extend(std::iter::repeat((0.0_f32, 0.0_f32)).take(sub_batch.len()));
                }
            }
        }
        coordinates
    }
}

fn assign_topics(batch: &[ChunkRow], topics: &[TopicCentroid]) -> Vec<String> {
    batch
        .iter()
        .map(|chunk| {
            topics
                .iter()
                .map(|topic| (topic.cluster_id.as_str(), cosine_similarity(&chunk.embedding, &topic.centroid)))
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(cluster_id, _)| cluster_id.to_string())
                .unwrap_or_default()
        })
        .collect()
}

fn document_projection_doc(chunk: &ChunkRow, cluster_id: &str, x: f32, y: f32) -> Value {
    json!({
        "document_id": chunk.document_id,
        "title": chunk.title,
        "abstract": chunk.text,
        "date": chunk.article_date.format("%Y-%m-%d").to_string(),
        "authors": chunk.authors,
        "keywords": chunk.keywords,
        "mesh": chunk.mesh_terms,
        "chemicals": chunk.chemicals,
        "journalTitle": chunk.journal,
        "cluster_id": cluster_id,
        "x": x,
        "y": y,
        "pubmed_bert_vector": chunk.embedding,
    })
}

fn date_range_query(start: NaiveDate, end: NaiveDate) -> Value {
    json!({
        "range": {
            "articleDate": {
                "gte": start.format("%Y-%m-%d").to_string(),
                "lte": end.format("%Y-%m-%d").to_string(),
            }
        }
    })
}

fn parse_chunk(id: String, source: Value) -> Result<ChunkRow, AssignmentError> {
    let embedding: Embedding = source["pubmed_bert_vector"]
        .as_array()
        .ok_or_else(|| AssignmentError::Deserialize(id.clone()))?
        .iter()
        .map(|value| value.as_f64().unwrap_or(0.0) as f32)
        .collect();

    let article_date = source["articleDate"]
        .as_str()
        .and_then(|value| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok())
        .ok_or_else(|| AssignmentError::Deserialize(id.clone()))?;

    let strings = |field: &str| -> Vec<String> {
        source[field]
            .as_array()
            .map(|values| values.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    };

    Ok(ChunkRow {
        document_id: id,
        text: source["text"].as_str().unwrap_or_default().to_string(),
        embedding,
        article_date,
        title: source["title"].as_str().unwrap_or_default().to_string(),
        journal: source["journalTitle"].as_str().unwrap_or_default().to_string(),
        mesh_terms: strings("meshNames"),
        chemicals: strings("chemicals"),
        keywords: strings("keywords"),
        authors: strings("authorNames"),
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
        upserted: Mutex<Vec<(String, Value)>>,
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
        async fn bulk_upsert(&self, _index: &str, items: Vec<(String, Value)>) -> Result<BulkResult, StoreError> {
            self.upserted.lock().unwrap().extend(items);
            Ok(BulkResult::default())
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
    struct FailingProjector;

    #[async_trait]
    impl Projector2D for FailingProjector {
        async fn project(&self, _centroids: &[Embedding]) -> Result<Vec<(f32, f32)>, hierarchy::ProjectorError> {
            Err(hierarchy::ProjectorError("projector unavailable".to_string()))
        }
    }

    fn chunk_hit(id: &str, embedding: Vec<f32>) -> (String, Value) {
        (
            id.to_string(),
            json!({
                "text": "chunk text",
                "pubmed_bert_vector": embedding,
                "articleDate": "2024-01-01",
                "title": "t",
                "journalTitle": "j",
                "meshNames": ["gene"],
                "chemicals": [],
                "keywords": [],
                "authorNames": ["Jane Doe"],
            }),
        )
    }

    #[tokio::test]
    async fn assigns_the_nearest_topic_and_substitutes_zero_on_projector_failure() {
        let store = MockStore {
            page: Mutex::new(Some(SearchPage {
                hits: vec![chunk_hit("1_0", vec![1.0, 0.0])],
                scroll_cursor: None,
            })),
            upserted: Mutex::new(Vec::new()),
        };
        let topics = vec![
            TopicCentroid {
                cluster_id: "0".to_string(),
                centroid: vec![1.0, 0.0],
            },
            TopicCentroid {
                cluster_id: "1".to_string(),
                centroid: vec![0.0, 1.0],
            },
        ];

        let assigner = DocumentAssigner::new(&store, &FailingProjector, "chunks".to_string(), "documents".to_string(), &topics);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let assigned = assigner.run(start, end).await.unwrap();

        assert_eq!(assigned, 1);
        let upserted = store.upserted.lock().unwrap();
        let (_, doc) = &upserted[0];
        assert_eq!(doc["cluster_id"], "0");
        assert_eq!(doc["x"], 0.0);
        assert_eq!(doc["y"], 0.0);
    }
}
