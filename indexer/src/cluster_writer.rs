use litmap_store::{mapping::cluster_index_body, StoreClient};
use litmap_types::Cluster;
use observability_deps::tracing::warn;
use serde_json::{json, Value};
use thiserror::Error;

const WRITE_BATCH_SIZE: usize = 50;

#[derive(Debug, Error)]
pub enum ClusterWriteError {
    #[error("store error: {0}")]
    Store(#[from] litmap_store::StoreError),
}

/// Idempotent cluster writes (spec C10, §4.10): `ensure_index`, `get(id)`
/// first to skip clusters already present, then bulk-write the rest in
/// batches of 50, logging and continuing past per-item failures.
pub async fn write_clusters(store: &dyn StoreClient, index: &str, clusters: &[Cluster]) -> Result<usize, ClusterWriteError> {
    store.ensure_index(index, cluster_index_body()).await?;

    let mut pending = Vec::new();
    let mut written = 0;

    for cluster in clusters {
        if store.get(index, &cluster.id).await?.is_some() {
            continue;
        }
        pending.push((cluster.id.clone(), cluster_document(cluster)));
        if pending.len() >= WRITE_BATCH_SIZE {
            written += flush(store, index, &mut pending).await?;
        }
    }
    written += flush(store, index, &mut pending).await?;

    Ok(written)
}

async fn flush(store: &dyn StoreClient, index: &str, pending: &mut Vec<(String, Value)>) -> Result<usize, ClusterWriteError> {
    if pending.is_empty() {
        return Ok(0);
    }
    let batch = std::mem::take(pending);
    let count = batch.len();

    let result = store.bulk_upsert(index, batch).await?;
    for failure in &result.failures {
        warn!(cluster = %failure.id, reason = %failure.reason, "cluster write failed");
    }
    Ok(count - result.failures.len())
}

fn cluster_document(cluster: &Cluster) -> Value {
    let path = Cluster::truncate_path_for_storage(&cluster.path);
    let topic_information: Vec<Value> = cluster.topic_words.iter().map(|word| json!({ "word": word })).collect();
    let pairwise_similarity: Vec<Value> = cluster
        .pairwise_similarity
        .iter()
        .map(|(other_id, score)| json!({ "other_cluster_id": other_id, "similarity_score": score }))
        .collect();

    json!({
        "id": cluster.id,
        "label": cluster.label,
        "description": cluster.description,
        "topic_information": topic_information,
        "is_leaf": cluster.is_leaf,
        "depth": cluster.depth,
        "path": path,
        "x": cluster.x,
        "y": cluster.y,
        "children": cluster.children,
        "size": cluster.size,
        "cluster_embedding": cluster.centroid,
        "pairwise_similarity": pairwise_similarity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use litmap_store::{BulkResult, SearchPage, StoreError};
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct MockStore {
        present: Mutex<Vec<String>>,
        upserted: Mutex<Vec<String>>,
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
            Ok(SearchPage::default())
        }
        async fn scroll(&self, _cursor: &str, _keep_alive: Duration) -> Result<SearchPage, StoreError> {
            Ok(SearchPage::default())
        }
        async fn clear_scroll(&self, _cursor: &str) -> Result<(), StoreError> {
            Ok(())
        }
        async fn bulk_upsert(&self, _index: &str, items: Vec<(String, Value)>) -> Result<BulkResult, StoreError> {
            let mut upserted = self.upserted.lock().unwrap();
            upserted.extend(items.into_iter().map(|(id, _)| id));
            Ok(BulkResult::default())
        }
        async fn get(&self, _index: &str, id: &str) -> Result<Option<Value>, StoreError> {
            Ok(if self.present.lock().unwrap().contains(&id.to_string()) {
                Some(json!({}))
            } else {
                None
            })
        }
        async fn update(&self, _index: &str, _id: &str, _partial_doc: Value) -> Result<(), StoreError> {
            unimplemented!()
        }
        async fn delete_by_query(&self, _index: &str, _query: Value) -> Result<(), StoreError> {
            unimplemented!()
        }
    }

    fn sample_cluster(id: &str) -> Cluster {
        Cluster {
            id: id.to_string(),
            label: Some("gene editing".to_string()),
            description: Some("short description".to_string()),
            topic_words: BTreeSet::from(["gene".to_string(), "editing".to_string()]),
            is_leaf: true,
            depth: 0,
            path: id.to_string(),
            x: 0.1,
            y: 0.2,
            children: Vec::new(),
            size: 1,
            centroid: vec![0.1; 4],
            pairwise_similarity: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn already_present_clusters_are_skipped() {
        let store = MockStore {
            present: Mutex::new(vec!["0".to_string()]),
            upserted: Mutex::new(Vec::new()),
        };
        let clusters = vec![sample_cluster("0"), sample_cluster("1")];

        let written = write_clusters(&store, "clusters", &clusters).await.unwrap();

        assert_eq!(written, 1);
        assert_eq!(*store.upserted.lock().unwrap(), vec!["1".to_string()]);
    }
}
