use std::sync::Arc;

use chrono::NaiveDate;
use litmap_entrez::EntrezClient;
use litmap_store::{mapping::article_index_body, StoreClient};
use litmap_types::Article;
use litmap_util::{batches, CancellationFlag};
use observability_deps::tracing::{error, info, warn};
use thiserror::Error;

/// A day that exhausted [`MAX_DAY_ATTEMPTS`] without a single failure-free
/// pass is reported as stuck rather than retried forever (spec §9, open
/// question O2).
const MAX_DAY_ATTEMPTS: u32 = 3;

/// Ids are fetched from the article service in groups of 100 (spec §4.5).
const FETCH_GROUP_SIZE: usize = 100;

/// Bulk upsert batch size into the article index (spec §4.5).
const UPSERT_BATCH_SIZE: usize = 50;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("article service error: {0}")]
    Entrez(#[from] litmap_entrez::EntrezError),

    #[error("store error: {0}")]
    Store(#[from] litmap_store::StoreError),

    #[error("failed to parse XML batch: {0}")]
    Xml(#[from] litmap_xml::XmlError),
}

/// Outcome of a single date in [`IngestSummary::days`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayOutcome {
    /// No failures on some attempt; `upserted` ids made it into the store.
    Complete { upserted: usize },
    /// Every attempt up to [`MAX_DAY_ATTEMPTS`] had at least one failure.
    Stuck { attempts: u32 },
}

#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    pub days: Vec<(NaiveDate, DayOutcome)>,
    pub cancelled: bool,
}

impl IngestSummary {
    pub fn stuck_days(&self) -> impl Iterator<Item = &NaiveDate> {
        self.days
            .iter()
            .filter(|(_, outcome)| matches!(outcome, DayOutcome::Stuck { .. }))
            .map(|(date, _)| date)
    }
}

/// Drives Stage I (spec C5, §4.5): walks a date range newest-first, dedupes
/// against the article index, and fetches+parses+upserts whatever is
/// missing. Idempotent — re-running over the same range just re-upserts.
#[derive(Debug, Clone)]
pub struct IngestOrchestrator {
    entrez: Arc<dyn EntrezClient>,
    store: Arc<dyn StoreClient>,
    article_index: String,
}

impl IngestOrchestrator {
    pub fn new(entrez: Arc<dyn EntrezClient>, store: Arc<dyn StoreClient>, article_index: String) -> Self {
        Self {
            entrez,
            store,
            article_index,
        }
    }

    /// Runs the full `[start, end]` range, newest date first, stopping early
    /// (and marking [`IngestSummary::cancelled`]) if `cancellation` fires
    /// between days.
    pub async fn run(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        cancellation: &CancellationFlag,
    ) -> Result<IngestSummary, IngestError> {
        self.store
            .ensure_index(&self.article_index, article_index_body())
            .await?;

        let mut summary = IngestSummary::default();
        let mut date = end;
        loop {
            if cancellation.is_cancelled() {
                info!("ingest cancelled");
                summary.cancelled = true;
                break;
            }

            let outcome = self.run_day(date).await?;
            info!(date = %date, outcome = ?outcome, "ingest day complete");
            summary.days.push((date, outcome));

            if date == start {
                break;
            }
            date = date.pred_opt().expect("date range stays in NaiveDate bounds");
        }

        Ok(summary)
    }

    /// Retries a single day up to [`MAX_DAY_ATTEMPTS`] times; the day
    /// "counter" only advances once a whole pass completes with zero
    /// per-item failures (spec §4.5).
    async fn run_day(&self, date: NaiveDate) -> Result<DayOutcome, IngestError> {
        for attempt in 1..=MAX_DAY_ATTEMPTS {
            match self.attempt_day(date).await {
                Ok(upserted) => return Ok(DayOutcome::Complete { upserted }),
                Err(err) => {
                    warn!(date = %date, attempt, error = %err, "ingest day attempt failed");
                }
            }
        }
        error!(date = %date, "ingest day stuck after max attempts");
        Ok(DayOutcome::Stuck {
            attempts: MAX_DAY_ATTEMPTS,
        })
    }

    /// One full pass over a day: fetch ids, dedupe, fetch+parse+upsert in
    /// groups. A bulk item failure in any group marks the whole day failed
    /// but does not stop the remaining groups from being attempted (spec
    /// §4.5); only a hard fetch/parse error aborts the pass early.
    async fn attempt_day(&self, date: NaiveDate) -> Result<usize, IngestError> {
        let all_ids = self.entrez.search_ids(date, date).await?;
        let missing = self.store.mget_missing(&self.article_index, &all_ids).await?;

        if missing.is_empty() {
            return Ok(0);
        }

        let mut upserted = 0;
        let mut had_failure = false;
        for group in batches(missing, FETCH_GROUP_SIZE) {
            let xml = self.entrez.fetch_xml(&group).await?;
            let articles = litmap_xml::parse_articles(&xml)?;
            let (group_upserted, group_had_failure) = self.upsert_articles(articles).await;
            upserted += group_upserted;
            had_failure |= group_had_failure;
        }

        if had_failure {
            return Err(IngestError::Store(litmap_store::StoreError::Permanent(
                format!("one or more bulk upsert batches failed for {date}"),
            )));
        }
        Ok(upserted)
    }

    /// Upserts every page of `articles`, continuing past a failed page
    /// rather than aborting the remaining ones; the caller decides what a
    /// failure means for the day as a whole.
    async fn upsert_articles(&self, articles: Vec<Article>) -> (usize, bool) {
        let mut upserted = 0;
        let mut had_failure = false;
        for page in batches(articles, UPSERT_BATCH_SIZE) {
            let items = page
                .into_iter()
                .map(|article| {
                    let id = article.id.clone();
                    let doc = serde_json::to_value(&article)
                        .expect("Article always serializes to a JSON object");
                    (id, doc)
                })
                .collect::<Vec<_>>();
            let page_len = items.len();

            match self.store.bulk_upsert(&self.article_index, items).await {
                Ok(result) if result.is_clean() => {
                    upserted += page_len;
                }
                Ok(result) => {
                    warn!(failures = result.failures.len(), "article bulk upsert had failures");
                    had_failure = true;
                    upserted += page_len - result.failures.len();
                }
                Err(err) => {
                    error!(error = %err, "article bulk upsert failed");
                    had_failure = true;
                }
            }
        }
        (upserted, had_failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use litmap_entrez::EntrezError;
    use litmap_store::{BulkResult, SearchPage, StoreError};
    use serde_json::Value;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct MockEntrez {
        ids: Vec<String>,
        xml: String,
    }

    #[async_trait]
    impl EntrezClient for MockEntrez {
        async fn search_ids(&self, _mindate: NaiveDate, _maxdate: NaiveDate) -> Result<Vec<String>, EntrezError> {
            Ok(self.ids.clone())
        }

        async fn fetch_xml(&self, _ids: &[String]) -> Result<String, EntrezError> {
            Ok(self.xml.clone())
        }
    }

    #[derive(Debug, Default)]
    struct MockStore {
        present: Vec<String>,
        upserted: Mutex<Vec<String>>,
        fail_bulk: bool,
        /// Fails only the first `bulk_upsert` call, so tests can assert that
        /// later pages/groups still get attempted.
        fail_first_bulk_call: bool,
        bulk_calls: Mutex<u32>,
    }

    #[async_trait]
    impl StoreClient for MockStore {
        async fn ensure_index(&self, _index: &str, _mapping: Value) -> Result<(), StoreError> {
            Ok(())
        }

        async fn mget_missing(&self, _index: &str, ids: &[String]) -> Result<Vec<String>, StoreError> {
            Ok(ids.iter().filter(|id| !self.present.contains(id)).cloned().collect())
        }

        async fn search(&self, _index: &str, _query: Value, _size: usize, _sort: Option<Value>) -> Result<SearchPage, StoreError> {
            unimplemented!()
        }

        async fn scroll(&self, _cursor: &str, _keep_alive: Duration) -> Result<SearchPage, StoreError> {
            unimplemented!()
        }

        async fn clear_scroll(&self, _cursor: &str) -> Result<(), StoreError> {
            unimplemented!()
        }

        async fn bulk_upsert(&self, _index: &str, items: Vec<(String, Value)>) -> Result<BulkResult, StoreError> {
            let mut calls = self.bulk_calls.lock().unwrap();
            *calls += 1;
            let is_first_call = *calls == 1;
            drop(calls);

            if self.fail_bulk || (self.fail_first_bulk_call && is_first_call) {
                return Ok(BulkResult {
                    failures: items
                        .iter()
                        .map(|(id, _)| litmap_store::BulkItemFailure {
                            id: id.clone(),
                            reason: "boom".to_string(),
                        })
                        .collect(),
                });
            }
            self.upserted.lock().unwrap().extend(items.into_iter().map(|(id, _)| id));
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

    const SAMPLE_XML: &str = r#"<PubmedArticleSet>
<PubmedArticle>
<MedlineCitation Status="MEDLINE">
  <PMID>1</PMID>
  <Article>
    <Journal><JournalIssue><PubDate><Year>2024</Year><Month>1</Month><Day>1</Day></PubDate></JournalIssue></Journal>
    <ArticleTitle>A title</ArticleTitle>
  </Article>
</MedlineCitation>
</PubmedArticle>
</PubmedArticleSet>"#;

    #[tokio::test]
    async fn ingests_missing_ids_for_a_single_day_range() {
        let entrez = Arc::new(MockEntrez {
            ids: vec!["1".to_string()],
            xml: SAMPLE_XML.to_string(),
        });
        let store = Arc::new(MockStore::default());
        let orchestrator = IngestOrchestrator::new(entrez, store.clone(), "articles".to_string());

        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let summary = orchestrator.run(day, day, &CancellationFlag::new()).await.unwrap();

        assert_eq!(summary.days.len(), 1);
        assert_eq!(summary.days[0].1, DayOutcome::Complete { upserted: 1 });
        assert_eq!(*store.upserted.lock().unwrap(), vec!["1".to_string()]);
    }

    #[tokio::test]
    async fn already_present_ids_are_skipped() {
        let entrez = Arc::new(MockEntrez {
            ids: vec!["1".to_string()],
            xml: SAMPLE_XML.to_string(),
        });
        let store = Arc::new(MockStore {
            present: vec!["1".to_string()],
            ..Default::default()
        });
        let orchestrator = IngestOrchestrator::new(entrez, store.clone(), "articles".to_string());

        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let summary = orchestrator.run(day, day, &CancellationFlag::new()).await.unwrap();

        assert_eq!(summary.days[0].1, DayOutcome::Complete { upserted: 0 });
        assert!(store.upserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn a_day_that_always_fails_bulk_upsert_is_reported_stuck() {
        let entrez = Arc::new(MockEntrez {
            ids: vec!["1".to_string()],
            xml: SAMPLE_XML.to_string(),
        });
        let store = Arc::new(MockStore {
            fail_bulk: true,
            ..Default::default()
        });
        let orchestrator = IngestOrchestrator::new(entrez, store, "articles".to_string());

        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let summary = orchestrator.run(day, day, &CancellationFlag::new()).await.unwrap();

        assert_eq!(
            summary.days[0].1,
            DayOutcome::Stuck {
                attempts: MAX_DAY_ATTEMPTS
            }
        );
        assert_eq!(summary.stuck_days().count(), 1);
    }

    fn bare_article(id: &str) -> Article {
        Article {
            id: id.to_string(),
            title: "A title".to_string(),
            vernacular_title: None,
            abstract_text: None,
            other_abstract: None,
            language: None,
            status: None,
            article_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            history: Vec::new(),
            authors: Vec::new(),
            grants: Vec::new(),
            chemicals: Vec::new(),
            keywords: Vec::new(),
            mesh_terms: Vec::new(),
            publication_types: Vec::new(),
            journal: litmap_types::JournalInfo {
                title: None,
                abbreviation: None,
                issue: litmap_types::Issue {
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
    async fn a_failed_page_does_not_stop_later_pages_from_being_attempted() {
        let entrez = Arc::new(MockEntrez::default());
        let store = Arc::new(MockStore {
            fail_first_bulk_call: true,
            ..Default::default()
        });
        let orchestrator = IngestOrchestrator::new(entrez, store.clone(), "articles".to_string());

        // Two full pages so `upsert_articles` makes two `bulk_upsert` calls;
        // only the first is made to fail.
        let articles: Vec<Article> = (0..UPSERT_BATCH_SIZE * 2).map(|i| bare_article(&i.to_string())).collect();

        let (upserted, had_failure) = orchestrator.upsert_articles(articles).await;

        assert!(had_failure);
        assert_eq!(upserted, UPSERT_BATCH_SIZE);
        assert_eq!(store.upserted.lock().unwrap().len(), UPSERT_BATCH_SIZE);
        assert_eq!(*store.bulk_calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn cancellation_stops_before_the_next_day() {
        let entrez = Arc::new(MockEntrez::default());
        let store = Arc::new(MockStore::default());
        let orchestrator = IngestOrchestrator::new(entrez, store, "articles".to_string());

        let flag = CancellationFlag::new();
        flag.cancel();

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let summary = orchestrator.run(start, end, &flag).await.unwrap();

        assert!(summary.cancelled);
        assert!(summary.days.is_empty());
    }
}
