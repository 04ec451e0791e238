use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use observability_deps::tracing::{info, warn};

use crate::error::EntrezError;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(5);
const FETCH_PAGE_PAUSE: Duration = Duration::from_secs(1);
const LARGE_RESULT_THRESHOLD: usize = 10_000;
const PAGE_SIZE: usize = 1_000;

/// The history tokens returned by an id-search with `usehistory=y`, used
/// to page through a large result set without resending the date range.
#[derive(Debug, Clone)]
pub struct HistoryToken {
    pub web_env: String,
    pub query_key: String,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct EntrezConfig {
    pub base_url: String,
    pub db: String,
    pub timeout: Duration,
}

#[async_trait]
pub trait EntrezClient: std::fmt::Debug + Send + Sync {
    /// Returns every external id published in `[mindate, maxdate]`,
    /// transparently paging in batches of 1000 when the result set exceeds
    /// 10,000 ids (spec §4.3).
    async fn search_ids(
        &self,
        mindate: NaiveDate,
        maxdate: NaiveDate,
    ) -> Result<Vec<String>, EntrezError>;

    /// Fetches raw `<PubmedArticle>` XML for an explicit batch of ids
    /// (spec §4.5: ingest fetches in groups of 100).
    async fn fetch_xml(&self, ids: &[String]) -> Result<String, EntrezError>;
}

#[derive(Debug, Clone)]
pub struct HttpEntrezClient {
    http: reqwest::Client,
    config: EntrezConfig,
}

impl HttpEntrezClient {
    pub fn new(config: EntrezConfig) -> Result<Self, EntrezError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn esearch(
        &self,
        mindate: NaiveDate,
        maxdate: NaiveDate,
    ) -> Result<HistoryToken, EntrezError> {
        let db = self.config.db.clone();
        let mindate = mindate.format("%Y/%m/%d").to_string();
        let maxdate = maxdate.format("%Y/%m/%d").to_string();

        let response = retry_linear(|| {
            let http = self.http.clone();
            let url = self.url("esearch.fcgi");
            let db = db.clone();
            let mindate = mindate.clone();
            let maxdate = maxdate.clone();
            async move {
                http.get(url)
                    .query(&[
                        ("db", db.as_str()),
                        ("mindate", mindate.as_str()),
                        ("maxdate", maxdate.as_str()),
                        ("datetype", "pdat"),
                        ("retmax", "0"),
                        ("usehistory", "y"),
                        ("retmode", "json"),
                    ])
                    .send()
                    .await?
                    .text()
                    .await
                    .map_err(EntrezError::from)
            }
        })
        .await?;

        parse_esearch_response(&response)
    }

    async fn efetch_page(
        &self,
        token: &HistoryToken,
        retstart: usize,
        retmax: usize,
    ) -> Result<String, EntrezError> {
        let db = self.config.db.clone();
        let web_env = token.web_env.clone();
        let query_key = token.query_key.clone();
        let retstart = retstart.to_string();
        let retmax = retmax.to_string();

        retry_linear(|| {
            let http = self.http.clone();
            let url = self.url("efetch.fcgi");
            let db = db.clone();
            let web_env = web_env.clone();
            let query_key = query_key.clone();
            let retstart = retstart.clone();
            let retmax = retmax.clone();
            async move {
                http.get(url)
                    .query(&[
                        ("db", db.as_str()),
                        ("WebEnv", web_env.as_str()),
                        ("query_key", query_key.as_str()),
                        ("retstart", retstart.as_str()),
                        ("retmax", retmax.as_str()),
                        ("rettype", "xml"),
                    ])
                    .send()
                    .await?
                    .text()
                    .await
                    .map_err(EntrezError::from)
            }
        })
        .await
    }
}

#[async_trait]
impl EntrezClient for HttpEntrezClient {
    async fn search_ids(
        &self,
        mindate: NaiveDate,
        maxdate: NaiveDate,
    ) -> Result<Vec<String>, EntrezError> {
        let token = self.esearch(mindate, maxdate).await?;
        info!(count = token.count, "article service search complete");

        if token.count == 0 {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(token.count);
        let mut retstart = 0;
        let page_size = if token.count > LARGE_RESULT_THRESHOLD {
            PAGE_SIZE
        } else {
            token.count
        };

        while retstart < token.count {
            if retstart > 0 {
                tokio::time::sleep(FETCH_PAGE_PAUSE).await;
            }
            let xml = self.efetch_page(&token, retstart, page_size).await?;
            ids.extend(extract_pmids(&xml));
            retstart += page_size;
        }

        Ok(ids)
    }

    async fn fetch_xml(&self, ids: &[String]) -> Result<String, EntrezError> {
        if ids.is_empty() {
            return Ok(String::new());
        }
        let db = self.config.db.clone();
        let id_list = ids.join(",");

        retry_linear(|| {
            let http = self.http.clone();
            let url = self.url("efetch.fcgi");
            let db = db.clone();
            let id_list = id_list.clone();
            async move {
                http.get(url)
                    .query(&[
                        ("db", db.as_str()),
                        ("id", id_list.as_str()),
                        ("rettype", "xml"),
                    ])
                    .send()
                    .await?
                    .text()
                    .await
                    .map_err(EntrezError::from)
            }
        })
        .await
    }
}

/// Fixed-delay retry loop: up to [`MAX_ATTEMPTS`] attempts with a constant
/// [`RETRY_DELAY`] between them (spec §4.3 — *linear* backoff, deliberately
/// not the `backoff` crate's exponential default).
async fn retry_linear<F, Fut, T>(mut make_request: F) -> Result<T, EntrezError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, EntrezError>>,
{
    let mut last_error = None;
    for attempt in 1..=MAX_ATTEMPTS {
        match make_request().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(attempt, error = %err, "article service request failed, retrying");
                last_error = Some(err);
                if attempt < MAX_ATTEMPTS {
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }
    Err(EntrezError::Exhausted {
        attempts: MAX_ATTEMPTS,
        last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}

fn parse_esearch_response(body: &str) -> Result<HistoryToken, EntrezError> {
    let json: serde_json::Value =
        serde_json::from_str(body).map_err(|e| EntrezError::InvalidResponse(e.to_string()))?;

    let result = json
        .get("esearchresult")
        .ok_or_else(|| EntrezError::InvalidResponse("missing esearchresult".into()))?;

    let count: usize = result
        .get("count")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let web_env = result
        .get("webenv")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let query_key = result
        .get("querykey")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(HistoryToken {
        web_env,
        query_key,
        count,
    })
}

/// Pulls `<PMID>...</PMID>` values out of an efetch XML page. Used only for
/// id discovery; full-record parsing is `litmap_xml`'s job.
fn extract_pmids(xml: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find("<PMID") {
        let after_tag_open = &rest[start..];
        let Some(gt) = after_tag_open.find('>') else {
            break;
        };
        let content_start = &after_tag_open[gt + 1..];
        let Some(end) = content_start.find("</PMID>") else {
            break;
        };
        ids.push(content_start[..end].trim().to_string());
        rest = &content_start[end..];
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_esearch_json() {
        let body = r#"{"esearchresult":{"count":"42","webenv":"WE123","querykey":"1"}}"#;
        let token = parse_esearch_response(body).unwrap();
        assert_eq!(token.count, 42);
        assert_eq!(token.web_env, "WE123");
        assert_eq!(token.query_key, "1");
    }

    #[test]
    fn extracts_pmids_from_xml() {
        let xml = "<PubmedArticleSet><PubmedArticle><MedlineCitation><PMID Version=\"1\">123</PMID></MedlineCitation></PubmedArticle><PubmedArticle><MedlineCitation><PMID>456</PMID></MedlineCitation></PubmedArticle></PubmedArticleSet>";
        assert_eq!(extract_pmids(xml), vec!["123".to_string(), "456".to_string()]);
    }
}
