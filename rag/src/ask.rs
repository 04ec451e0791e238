use std::sync::Arc;

use axum::{extract::State, Json};
use litmap_llm::prompts::ANSWER_SYNTHESIS_PROMPT;
use litmap_types::{
    wire::{AskRequest, AskResponse, QuestionType, SupportingInfo},
    Intent,
};
use serde_json::{json, Value};

use crate::{tokens::count_tokens, AppError, AppState};

const CORPUS_SEARCH_SIZE: usize = 50;

pub async fn ask(State(state): State<Arc<AppState>>, Json(request): Json<AskRequest>) -> Result<Json<AskResponse>, AppError> {
    let response = match request.question_type {
        QuestionType::DocumentSpecific => document_specific(&state, &request).await?,
        QuestionType::CorpusSpecific => corpus_specific(&state, &request).await?,
    };
    Ok(Json(response))
}

/// Filtered vector search over the chunk index, cosine-similarity scored,
/// restricted to the supplied document ids; concatenates chunks in
/// arrival (score) order up to the remaining context budget (spec §4.11).
async fn document_specific(state: &AppState, request: &AskRequest) -> Result<AskResponse, AppError> {
    let document_ids: Vec<String> = request.supporting_information.iter().map(SupportingInfo::as_str_value).collect();
    let query_embedding = state.embedder.embed(&request.question).await?;

    let query = json!({
        "script_score": {
            "query": { "terms": { "articleId": document_ids } },
            "script": {
                "source": "cosineSimilarity(params.query_vector, 'pubmed_bert_vector') + 1.0",
                "params": { "query_vector": query_embedding },
            },
        }
    });

    let page = state
        .store
        .search(&state.config.chunk_index, query, state.config.document_top_k, None)
        .await?;

    let budget = context_token_budget(&state.config, &request.question);
    let mut context = String::new();
    let mut tokens_used = 0usize;
    let mut sources = Vec::new();

    for (_, source) in &page.hits {
        let text = source["text"].as_str().unwrap_or_default();
        let chunk_tokens = count_tokens(text);
        if tokens_used + chunk_tokens > budget {
            break;
        }
        if !context.is_empty() {
            context.push('\n');
        }
        context.push_str(text);
        tokens_used += chunk_tokens;

        let article_id = source["articleId"].as_str().unwrap_or_default().to_string();
        if !article_id.is_empty() && !sources.contains(&article_id) {
            sources.push(article_id);
        }
    }
    sources.truncate(5);

    let answer = state.llm.answer(&request.question, &context).await?;
    Ok(AskResponse { answer, sources })
}

fn context_token_budget(config: &crate::RagConfig, question: &str) -> usize {
    config
        .max_context_tokens
        .saturating_sub(count_tokens(question))
        .saturating_sub(count_tokens(ANSWER_SYNTHESIS_PROMPT))
        .saturating_sub(100)
}

/// Cluster-label lookup when labels are supplied directly, or C12 intent
/// parsing otherwise, each producing a cluster query whose hits are
/// aggregated and handed to the answer model as JSON (spec §4.11).
async fn corpus_specific(state: &AppState, request: &AskRequest) -> Result<AskResponse, AppError> {
    let supplied_labels: Vec<String> = request.supporting_information.iter().map(SupportingInfo::as_str_value).collect();

    let hits = if !supplied_labels.is_empty() {
        clusters_by_label(state, &supplied_labels).await?
    } else {
        match state.llm.parse_intent(&request.question).await? {
            Intent::ListTopicsInCluster { cluster } | Intent::ListQuestionsInCluster { cluster } => {
                clusters_by_label(state, &cluster).await?
            }
            Intent::GetCorpusInfo => corpus_info_clusters(state).await?,
        }
    };

    let retrieved_data = serde_json::to_string(&hits).unwrap_or_default();
    let answer = state.llm.answer(&request.question, &retrieved_data).await?;

    let mut sources = Vec::new();
    for hit in &hits {
        let cluster_id = hit["cluster_id"].as_str().unwrap_or_default().to_string();
        if !cluster_id.is_empty() && !sources.contains(&cluster_id) {
            sources.push(cluster_id);
        }
    }

    Ok(AskResponse { answer, sources })
}

async fn clusters_by_label(state: &AppState, labels: &[String]) -> Result<Vec<Value>, AppError> {
    let query = json!({
        "bool": {
            "should": labels.iter().map(|label| json!({ "match_phrase": { "label": label } })).collect::<Vec<_>>(),
            "minimum_should_match": 1,
        }
    });
    let page = state.store.search(&state.config.cluster_index, query, CORPUS_SEARCH_SIZE, None).await?;
    Ok(page.hits.iter().map(|(id, source)| cluster_summary(id, source)).collect())
}

async fn corpus_info_clusters(state: &AppState) -> Result<Vec<Value>, AppError> {
    let top_depth = match state.config.top_depth {
        Some(depth) => depth,
        None => resolve_top_depth(state).await?,
    };
    let query = json!({ "range": { "depth": { "gte": top_depth } } });
    let page = state.store.search(&state.config.cluster_index, query, CORPUS_SEARCH_SIZE, None).await?;
    Ok(page.hits.iter().map(|(id, source)| cluster_summary(id, source)).collect())
}

/// `D_top` fallback: the deepest cluster's depth minus 4 (Open Question,
/// resolved in DESIGN.md).
async fn resolve_top_depth(state: &AppState) -> Result<u32, AppError> {
    let sort = json!([{ "depth": "desc" }]);
    let page = state.store.search(&state.config.cluster_index, json!({ "match_all": {} }), 1, Some(sort)).await?;
    let max_depth = page.hits.first().and_then(|(_, source)| source["depth"].as_u64()).unwrap_or(0) as u32;
    Ok(max_depth.saturating_sub(4))
}

fn cluster_summary(id: &str, source: &Value) -> Value {
    json!({
        "cluster_id": id,
        "label": source["label"],
        "description": source["description"],
        "topic_words": source["topic_information"],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use embed::EmbedderError;
    use litmap_llm::LlmError;
    use litmap_store::{BulkResult, SearchPage, StoreClient, StoreError};
    use litmap_types::{Embedding, LlmMetadataResponse};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct MockStore {
        chunk_hits: Vec<(String, Value)>,
        cluster_hits: Vec<(String, Value)>,
    }

    #[async_trait]
    impl StoreClient for MockStore {
        async fn ensure_index(&self, _index: &str, _mapping: Value) -> Result<(), StoreError> {
            Ok(())
        }
        async fn mget_missing(&self, _index: &str, ids: &[String]) -> Result<Vec<String>, StoreError> {
            Ok(ids.to_vec())
        }
        async fn search(&self, index: &str, _query: Value, _size: usize, _sort: Option<Value>) -> Result<SearchPage, StoreError> {
            let hits = if index.contains("chunk") {
                self.chunk_hits.clone()
            } else {
                self.cluster_hits.clone()
            };
            Ok(SearchPage { hits, scroll_cursor: None })
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
    struct MockEmbedder;

    #[async_trait]
    impl Embedder for MockEmbedder {
        async fn embed(&self, _text: &str) -> Result<Embedding, EmbedderError> {
            Ok(vec![0.1; 4])
        }
    }

    #[derive(Debug)]
    struct MockLlm {
        answer: String,
    }

    #[async_trait]
    impl litmap_llm::LlmGateway for MockLlm {
        async fn topic_metadata(&self, _keywords: &[String]) -> LlmMetadataResponse {
            unimplemented!()
        }
        async fn parent_cluster_metadata(&self, _ll: &str, _ld: &str, _rl: &str, _rd: &str) -> LlmMetadataResponse {
            unimplemented!()
        }
        async fn parse_intent(&self, _question: &str) -> Result<Intent, LlmError> {
            Ok(Intent::GetCorpusInfo)
        }
        async fn answer(&self, _user_query: &str, _retrieved_data: &str) -> Result<String, LlmError> {
            Ok(self.answer.clone())
        }
    }

    fn state(store: MockStore, answer: &str) -> Arc<AppState> {
        Arc::new(AppState::new(
            Arc::new(store),
            Arc::new(MockLlm { answer: answer.to_string() }),
            Arc::new(MockEmbedder),
            crate::RagConfig::default(),
        ))
    }

    #[tokio::test]
    async fn document_specific_concatenates_chunks_and_dedupes_sources() {
        let store = MockStore {
            chunk_hits: vec![
                ("1_0".to_string(), json!({ "text": "first chunk", "articleId": "1" })),
                ("1_1".to_string(), json!({ "text": "second chunk", "articleId": "1" })),
                ("2_0".to_string(), json!({ "text": "third chunk", "articleId": "2" })),
            ],
            cluster_hits: vec![],
        };
        let state = state(store, "synthesized answer");

        let request = AskRequest {
            question: "what dose was used?".to_string(),
            question_type: QuestionType::DocumentSpecific,
            supporting_information: vec![SupportingInfo::Text("1".to_string()), SupportingInfo::Text("2".to_string())],
        };

        let response = document_specific(&state, &request).await.unwrap();
        assert_eq!(response.answer, "synthesized answer");
        assert_eq!(response.sources, vec!["1".to_string(), "2".to_string()]);
    }

    #[tokio::test]
    async fn corpus_specific_uses_supplied_labels_without_calling_intent_parser() {
        let store = MockStore {
            chunk_hits: vec![],
            cluster_hits: vec![(
                "c1".to_string(),
                json!({ "label": "gene editing", "description": "crispr work", "topic_information": [] }),
            )],
        };
        let state = state(store, "cluster answer");

        let request = AskRequest {
            question: "what topics are in gene editing?".to_string(),
            question_type: QuestionType::CorpusSpecific,
            supporting_information: vec![SupportingInfo::Text("gene editing".to_string())],
        };

        let response = corpus_specific(&state, &request).await.unwrap();
        assert_eq!(response.answer, "cluster answer");
        assert_eq!(response.sources, vec!["c1".to_string()]);
    }

    #[tokio::test]
    async fn corpus_specific_falls_back_to_intent_parsing_for_corpus_info() {
        let store = MockStore {
            chunk_hits: vec![],
            cluster_hits: vec![("root".to_string(), json!({ "label": "root", "description": "all", "depth": 5 }))],
        };
        let state = state(store, "corpus overview");

        let request = AskRequest {
            question: "how big is the corpus?".to_string(),
            question_type: QuestionType::CorpusSpecific,
            supporting_information: vec![],
        };

        let response = corpus_specific(&state, &request).await.unwrap();
        assert_eq!(response.answer, "corpus overview");
        assert_eq!(response.sources, vec!["root".to_string()]);
    }
}
