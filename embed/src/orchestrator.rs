use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use litmap_store::{mapping::chunk_index_body, StoreClient};
use litmap_types::{Article, ChunkMetadata};
use litmap_util::{batches, CancellationFlag};
use observability_deps::tracing::{error, info, warn};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    chunker::{chunk_complete, chunk_sentence, ChunkStrategy},
    embedder::Embedder,
};

/// Articles are scrolled off the source index 500 at a time (spec §4.6).
const SCROLL_SIZE: usize = 500;
const SCROLL_KEEP_ALIVE: Duration = Duration::from_secs(600);

/// Chunk documents are bulk upserted in batches of 1000 (spec §4.6).
const UPSERT_BATCH_SIZE: usize = 1000;

const ABSTRACT_PLACEHOLDER_PHRASES: [&str; 2] =
    ["no abstract available on pubmed", "ABSTRACT TRUNCATED AT"];

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("store error: {0}")]
    Store(#[from] litmap_store::StoreError),

    #[error("failed to read article document: {0}")]
    Deserialize(String),
}

#[derive(Debug, Clone, Default)]
pub struct EmbedSummary {
    pub days: Vec<(NaiveDate, DaySummary)>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaySummary {
    pub chunks_embedded: usize,
    pub had_bulk_failure: bool,
}

/// Drives Stage E (spec C6, §4.6): scrolls the article index one day at a
/// time, chunks and embeds every usable abstract, bulk upserts into the
/// chunk index. A bulk failure sets a flag and moves on to the next batch
/// rather than aborting the day.
#[derive(Debug, Clone)]
pub struct EmbedOrchestrator {
    store: Arc<dyn StoreClient>,
    embedder: Arc<dyn Embedder>,
    article_index: String,
    chunk_index: String,
    strategy: ChunkStrategy,
}

impl EmbedOrchestrator {
    pub fn new(
        store: Arc<dyn StoreClient>,
        embedder: Arc<dyn Embedder>,
        article_index: String,
        chunk_index: String,
        strategy: ChunkStrategy,
    ) -> Self {
        Self {
            store,
            embedder,
            article_index,
            chunk_index,
            strategy,
        }
    }

    pub async fn run(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        cancellation: &CancellationFlag,
    ) -> Result<EmbedSummary, EmbedError> {
        self.store.ensure_index(&self.chunk_index, chunk_index_body()).await?;

        let mut summary = EmbedSummary::default();
        let mut date = end;
        loop {
            if cancellation.is_cancelled() {
                info!("embed cancelled");
                summary.cancelled = true;
                break;
            }

            let day_summary = self.run_day(date).await?;
            info!(date = %date, chunks = day_summary.chunks_embedded, "embed day complete");
            summary.days.push((date, day_summary));

            if date == start {
                break;
            }
            date = date.pred_opt().expect("date range stays in NaiveDate bounds");
        }

        Ok(summary)
    }

    /// Id-list mode (spec §6 `--json_file`): embeds exactly the given
    /// article ids instead of scrolling a date range, fetching each one
    /// individually since there is no bulk-get on [`StoreClient`].
    pub async fn run_ids(&self, article_ids: &[String], cancellation: &CancellationFlag) -> Result<DaySummary, EmbedError> {
        self.store.ensure_index(&self.chunk_index, chunk_index_body()).await?;

        let mut summary = DaySummary::default();
        let mut pending = Vec::new();

        for article_id in article_ids {
            if cancellation.is_cancelled() {
                info!("embed (id-list) cancelled");
                break;
            }

            let Some(source) = self.store.get(&self.article_index, article_id).await? else {
                warn!(article_id, "id-list article not found, skipping");
                continue;
            };
            let article: Article = serde_json::from_value(source).map_err(|e| EmbedError::Deserialize(e.to_string()))?;
            pending.extend(self.chunk_article(&article));

            if pending.len() >= UPSERT_BATCH_SIZE {
                self.flush(std::mem::take(&mut pending), &mut summary).await?;
            }
        }

        if !pending.is_empty() {
            self.flush(pending, &mut summary).await?;
        }

        Ok(summary)
    }

    async fn run_day(&self, date: NaiveDate) -> Result<DaySummary, EmbedError> {
        let query = usable_abstract_query(date);
        let mut page = self
            .store
            .search(&self.article_index, query, SCROLL_SIZE, None)
            .await?;

        let mut summary = DaySummary::default();
        let mut pending = Vec::new();

        loop {
            for (_, source) in std::mem::take(&mut page.hits) {
                let article: Article = serde_json::from_value(source)
                    .map_err(|e| EmbedError::Deserialize(e.to_string()))?;
                pending.extend(self.chunk_article(&article));
            }

            if pending.len() >= UPSERT_BATCH_SIZE {
                self.flush(std::mem::take(&mut pending), &mut summary).await?;
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

        if !pending.is_empty() {
            self.flush(pending, &mut summary).await?;
        }

        Ok(summary)
    }

    fn chunk_article(&self, article: &Article) -> Vec<(String, Value)> {
        if !article.has_usable_abstract() {
            return Vec::new();
        }
        let abstract_text = article.abstract_text.as_deref().unwrap_or_default();
        let texts = match self.strategy {
            ChunkStrategy::Complete => chunk_complete(abstract_text),
            ChunkStrategy::Sentence => chunk_sentence(abstract_text),
        };
        if texts.is_empty() {
            return Vec::new();
        }

        let metadata = denormalize_metadata(article, &self.article_index);
        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let chunk_index = index as u32;
                let id = format!("{}_{chunk_index}", article.id);
                let doc = pending_chunk_doc(&article.id, chunk_index, &text, &metadata);
                (id, doc)
            })
            .collect()
    }

    async fn flush(&self, pending: Vec<(String, Value)>, summary: &mut DaySummary) -> Result<(), EmbedError> {
        for batch in batches(pending, UPSERT_BATCH_SIZE) {
            let batch_len = batch.len();
            let embedded = self.embed_batch(batch).await;

            match self.store.bulk_upsert(&self.chunk_index, embedded).await {
                Ok(result) if result.is_clean() => {
                    summary.chunks_embedded += batch_len;
                }
                Ok(result) => {
                    warn!(failures = result.failures.len(), "chunk bulk upsert had failures");
                    summary.had_bulk_failure = true;
                    summary.chunks_embedded += batch_len - result.failures.len();
                }
                Err(err) => {
                    error!(error = %err, "chunk bulk upsert failed");
                    summary.had_bulk_failure = true;
                }
            }
        }
        Ok(())
    }

    /// Fills in the embedding vector for each pending chunk document,
    /// dropping (and logging) any chunk whose embedding call fails rather
    /// than failing the whole batch.
    async fn embed_batch(&self, batch: Vec<(String, Value)>) -> Vec<(String, Value)> {
        let mut embedded = Vec::with_capacity(batch.len());
        for (id, mut doc) in batch {
            let text = doc["text"].as_str().unwrap_or_default().to_string();
            match self.embedder.embed(&text).await {
                Ok(vector) => {
                    doc["pubmed_bert_vector"] = json!(vector);
                    embedded.push((id, doc));
                }
                Err(err) => {
                    warn!(id, error = %err, "embedding call failed, dropping chunk");
                }
            }
        }
        embedded
    }
}

fn denormalize_metadata(article: &Article, source_index: &str) -> ChunkMetadata {
    const PLACEHOLDER: &str = "NONE";

    ChunkMetadata {
        article_date: article.article_date,
        title: article.title.clone(),
        journal_title: article
            .journal
            .title
            .clone()
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        mesh_names: article.mesh_terms.iter().map(|m| m.name.clone()).collect(),
        mesh_ids: article
            .mesh_terms
            .iter()
            .map(|m| m.id.clone().unwrap_or_else(|| PLACEHOLDER.to_string()))
            .collect(),
        chemicals: article.chemicals.iter().map(|c| c.name_of_substance.clone()).collect(),
        keywords: article.keywords.iter().map(|k| k.name.clone()).collect(),
        author_names: article
            .authors
            .iter()
            .map(|a| {
                format!(
                    "{} {}",
                    a.first_name.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
                    a.last_name.clone().unwrap_or_else(|| PLACEHOLDER.to_string())
                )
            })
            .collect(),
        author_affiliations: article
            .authors
            .iter()
            .flat_map(|a| a.affiliations.iter().map(|aff| aff.text.clone()))
            .collect(),
        source_index: source_index.to_string(),
    }
}

fn pending_chunk_doc(article_id: &str, chunk_index: u32, text: &str, metadata: &ChunkMetadata) -> Value {
    json!({
        "articleId": article_id,
        "chunkIndex": chunk_index,
        "text": text,
        "articleDate": metadata.article_date.format("%Y-%m-%d").to_string(),
        "title": metadata.title,
        "journalTitle": metadata.journal_title,
        "meshNames": metadata.mesh_names,
        "meshIds": metadata.mesh_ids,
        "chemicals": metadata.chemicals,
        "keywords": metadata.keywords,
        "authorNames": metadata.author_names,
        "authorAffiliations": metadata.author_affiliations,
        "sourceIndex": metadata.source_index,
    })
}

fn usable_abstract_query(date: NaiveDate) -> Value {
    let date_str = date.format("%Y-%m-%d").to_string();
    json!({
        "bool": {
            "filter": [{ "term": { "articleDate": date_str } }],
            "must_not": ABSTRACT_PLACEHOLDER_PHRASES
                .iter()
                .map(|phrase| json!({ "match_phrase": { "abstract": phrase } }))
                .collect::<Vec<_>>()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use litmap_store::{BulkResult, SearchPage, StoreError};
    use litmap_types::{Issue, JournalInfo};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct MockEmbedder;

    #[async_trait]
    impl Embedder for MockEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, crate::embedder::EmbedderError> {
            Ok(vec![0.1; 768])
        }
    }

    #[derive(Debug, Default)]
    struct MockStore {
        page: Mutex<Option<SearchPage>>,
        upserted: Mutex<Vec<String>>,
        docs: Mutex<std::collections::HashMap<String, Value>>,
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
            self.upserted.lock().unwrap().extend(items.into_iter().map(|(id, _)| id));
            Ok(BulkResult::default())
        }

        async fn get(&self, _index: &str, id: &str) -> Result<Option<Value>, StoreError> {
            Ok(self.docs.lock().unwrap().get(id).cloned())
        }

        async fn update(&self, _index: &str, _id: &str, _partial_doc: Value) -> Result<(), StoreError> {
            unimplemented!()
        }

        async fn delete_by_query(&self, _index: &str, _query: Value) -> Result<(), StoreError> {
            unimplemented!()
        }
    }

    fn sample_article(id: &str, abstract_text: &str) -> Article {
        Article {
            id: id.to_string(),
            title: "A title".to_string(),
            vernacular_title: None,
            abstract_text: Some(abstract_text.to_string()),
            other_abstract: None,
            language: None,
            status: None,
            article_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            history: vec![],
            authors: vec![],
            grants: vec![],
            chemicals: vec![],
            keywords: vec![],
            mesh_terms: vec![],
            publication_types: vec![],
            journal: JournalInfo {
                title: Some("J Things".to_string()),
                abbreviation: None,
                issue: Issue {
                    medium: None,
                    volume: None,
                    number: None,
                    year: None,
                    month: None,
                    day: None,
                },
            },
            full_text_url: None,
            vectorised: false,
            nlp_processed: false,
            full_text: None,
        }
    }

    #[tokio::test]
    async fn embeds_and_upserts_chunks_for_a_usable_abstract() {
        let article = sample_article("1", "Background is clear. Methods followed the protocol.");
        let page = SearchPage {
            hits: vec![("1".to_string(), serde_json::to_value(&article).unwrap())],
            scroll_cursor: Some("cursor-1".to_string()),
        };
        let store = Arc::new(MockStore {
            page: Mutex::new(Some(page)),
            ..Default::default()
        });
        let embedder = Arc::new(MockEmbedder);
        let orchestrator = EmbedOrchestrator::new(
            store.clone(),
            embedder,
            "articles".to_string(),
            "chunks".to_string(),
            ChunkStrategy::Sentence,
        );

        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let summary = orchestrator.run(day, day, &CancellationFlag::new()).await.unwrap();

        assert_eq!(summary.days[0].1.chunks_embedded, 2);
        assert!(!summary.days[0].1.had_bulk_failure);
        assert_eq!(store.upserted.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn articles_without_a_usable_abstract_are_skipped() {
        let article = sample_article("2", "no abstract available on pubmed");
        let page = SearchPage {
            hits: vec![("2".to_string(), serde_json::to_value(&article).unwrap())],
            scroll_cursor: Some("cursor-2".to_string()),
        };
        let store = Arc::new(MockStore {
            page: Mutex::new(Some(page)),
            ..Default::default()
        });
        let embedder = Arc::new(MockEmbedder);
        let orchestrator = EmbedOrchestrator::new(
            store.clone(),
            embedder,
            "articles".to_string(),
            "chunks".to_string(),
            ChunkStrategy::Complete,
        );

        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let summary = orchestrator.run(day, day, &CancellationFlag::new()).await.unwrap();

        assert_eq!(summary.days[0].1.chunks_embedded, 0);
        assert!(store.upserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn run_ids_embeds_only_the_requested_articles() {
        let article = sample_article("3", "Background is clear. Methods followed the protocol.");
        let mut docs = std::collections::HashMap::new();
        docs.insert("3".to_string(), serde_json::to_value(&article).unwrap());
        let store = Arc::new(MockStore {
            docs: Mutex::new(docs),
            ..Default::default()
        });
        let embedder = Arc::new(MockEmbedder);
        let orchestrator = EmbedOrchestrator::new(
            store.clone(),
            embedder,
            "articles".to_string(),
            "chunks".to_string(),
            ChunkStrategy::Sentence,
        );

        let summary = orchestrator
            .run_ids(&["3".to_string(), "missing".to_string()], &CancellationFlag::new())
            .await
            .unwrap();

        assert_eq!(summary.chunks_embedded, 2);
        assert_eq!(store.upserted.lock().unwrap().len(), 2);
    }
}
