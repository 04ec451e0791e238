use std::collections::HashSet;

use litmap_artifacts::ArtifactStore;
use litmap_llm::LlmGateway;
use litmap_types::{LlmMetadataResponse, SliceTopic, Topic, TopicSlice};
use litmap_util::CheckpointedLoop;
use observability_deps::tracing::{info, warn};
use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;
use thiserror::Error;

use crate::cosine_similarity;

const CHECKPOINT_ARTIFACT: &str = "consolidate.ckpt";
const LABEL_SIMILARITY_THRESHOLD: f64 = 0.9;
const CENTROID_SIMILARITY_THRESHOLD: f32 = 0.9;

#[derive(Debug, Error)]
pub enum ConsolidateError {
    #[error("artifact error: {0}")]
    Artifact(#[from] litmap_artifacts::Error),
}

/// Checkpointed across artifacts (spec §4.8: "checkpoint after each
/// artifact ... on any exception persist the checkpoint and re-raise").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsolidateState {
    pub topics: Vec<Topic>,
    pub next_id: u64,
    pub processed_paths: Vec<String>,
}

/// Stage H1 (spec C8): reads each not-yet-processed topic-slice artifact in
/// `artifact_paths`, assigns every surviving topic (skipping the outlier
/// topic) a monotone global id, and synthesizes its label/description via
/// the LLM gateway.
pub async fn consolidate(
    artifacts: &ArtifactStore,
    llm: &dyn LlmGateway,
    artifact_paths: &[String],
) -> Result<ConsolidateState, ConsolidateError> {
    let mut loop_state = CheckpointedLoop::<ConsolidateState>::resume(artifacts, CHECKPOINT_ARTIFACT);
    let already_processed: HashSet<String> = loop_state.state().processed_paths.iter().cloned().collect();

    for path in artifact_paths {
        if already_processed.contains(path) {
            continue;
        }

        let slice: TopicSlice = match artifacts.load_artifact(path) {
            Ok(slice) => slice,
            Err(err) => {
                loop_state.checkpoint()?;
                return Err(err.into());
            }
        };

        for slice_topic in &slice.topics {
            if slice_topic.is_outlier() {
                continue;
            }
            let topic = assign_global_topic(loop_state.state_mut(), llm, slice_topic).await;
            loop_state.state_mut().topics.push(topic);
        }

        loop_state.state_mut().processed_paths.push(path.clone());
        loop_state.checkpoint()?;
        info!(artifact = %path, topics = loop_state.state().topics.len(), "consolidated topic slice");
    }

    Ok(loop_state.into_state())
}

async fn assign_global_topic(state: &mut ConsolidateState, llm: &dyn LlmGateway, slice_topic: &SliceTopic) -> Topic {
    let id = state.next_id.to_string();
    state.next_id += 1;

    let keywords: Vec<String> = slice_topic.words.iter().map(|(word, _)| word.clone()).collect();
    let metadata = enforce_topic_invariant(llm.topic_metadata(&keywords).await);
    if metadata.is_failure() {
        warn!(topic = %id, error = ?metadata.error, "topic metadata synthesis failed");
    }

    Topic {
        id,
        words: slice_topic.words.clone(),
        label: metadata.label,
        description: metadata.description,
        centroid: slice_topic.centroid.clone(),
    }
}

/// Prompts aren't contracts: the LLM can return well-formed JSON that still
/// violates the topic invariant (spec §3, "label ≤3 words, no punctuation;
/// description ≤15 words"). A response that fails this check is treated the
/// same as a parse failure rather than stored as-is.
fn enforce_topic_invariant(metadata: LlmMetadataResponse) -> LlmMetadataResponse {
    if metadata.is_failure() {
        return metadata;
    }
    let label = metadata.label.as_deref().unwrap_or_default();
    let description = metadata.description.as_deref().unwrap_or_default();
    if Topic::label_is_valid(label) && Topic::description_is_valid(description) {
        return metadata;
    }
    LlmMetadataResponse::parse_failure(
        format!("label/description violates the topic invariant: {label:?} / {description:?}"),
        format!("{label} | {description}"),
    )
}

/// Dedupe pass (spec §4.8): builds the pairwise cosine-similarity matrix of
/// centroids, merges topics whose labels fuzzy-match AND whose centroids
/// are cosine-similar, keeps the smaller id as canonical, and reassigns
/// compact ids `0..N-1` over the survivors in their original order.
pub fn dedupe(topics: Vec<Topic>) -> Vec<Topic> {
    let n = topics.len();
    let mut discarded = vec![false; n];

    for i in 0..n {
        if discarded[i] {
            continue;
        }
        for j in (i + 1)..n {
            if discarded[j] {
                continue;
            }
            if is_duplicate(&topics[i], &topics[j]) {
                discarded[j] = true;
            }
        }
    }

    topics
        .into_iter()
        .zip(discarded)
        .filter_map(|(topic, is_discarded)| (!is_discarded).then_some(topic))
        .enumerate()
        .map(|(index, mut topic)| {
            topic.id = index.to_string();
            topic
        })
        .collect()
}

fn is_duplicate(a: &Topic, b: &Topic) -> bool {
    let labels_match = match (&a.label, &b.label) {
        (Some(label_a), Some(label_b)) => label_fuzzy_match(label_a, label_b),
        _ => false,
    };
    labels_match && cosine_similarity(&a.centroid, &b.centroid) >= CENTROID_SIMILARITY_THRESHOLD
}

fn label_fuzzy_match(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    a == b || normalized_levenshtein(&a, &b) >= LABEL_SIMILARITY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use litmap_llm::LlmError;
    use litmap_types::{Intent, LlmMetadataResponse};

    #[derive(Debug)]
    struct MockLlm;

    #[async_trait]
    impl LlmGateway for MockLlm {
        async fn topic_metadata(&self, keywords: &[String]) -> LlmMetadataResponse {
            LlmMetadataResponse::ok(keywords.first().cloned().unwrap_or_default(), "a short description".to_string())
        }

        async fn parent_cluster_metadata(&self, _: &str, _: &str, _: &str, _: &str) -> LlmMetadataResponse {
            unimplemented!()
        }

        async fn parse_intent(&self, _question: &str) -> Result<Intent, LlmError> {
            unimplemented!()
        }

        async fn answer(&self, _user_query: &str, _retrieved_data: &str) -> Result<String, LlmError> {
            unimplemented!()
        }
    }

    fn slice_with_topics(topics: Vec<SliceTopic>) -> TopicSlice {
        TopicSlice {
            window_start: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            window_end: chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            topics,
            documents: Vec::new(),
        }
    }

    #[tokio::test]
    async fn outlier_topics_are_skipped_and_ids_assigned_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path());

        let slice = slice_with_topics(vec![
            SliceTopic {
                local_id: -1,
                words: vec![("noise".to_string(), 0.1)],
                centroid: vec![0.0; 4],
            },
            SliceTopic {
                local_id: 0,
                words: vec![("gene".to_string(), 0.9)],
                centroid: vec![1.0; 4],
            },
        ]);
        artifacts.save_artifact("slice-0.bin", &slice).unwrap();

        let state = consolidate(&artifacts, &MockLlm, &["slice-0.bin".to_string()]).await.unwrap();

        assert_eq!(state.topics.len(), 1);
        assert_eq!(state.topics[0].id, "0");
        assert_eq!(state.topics[0].label.as_deref(), Some("gene"));
    }

    #[tokio::test]
    async fn already_processed_artifacts_are_not_reprocessed() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        let slice = slice_with_topics(vec![SliceTopic {
            local_id: 0,
            words: vec![("gene".to_string(), 0.9)],
            centroid: vec![1.0; 4],
        }]);
        artifacts.save_artifact("slice-0.bin", &slice).unwrap();

        let first = consolidate(&artifacts, &MockLlm, &["slice-0.bin".to_string()]).await.unwrap();
        assert_eq!(first.topics.len(), 1);

        let second = consolidate(&artifacts, &MockLlm, &["slice-0.bin".to_string()]).await.unwrap();
        assert_eq!(second.topics.len(), 1, "reprocessing the same artifact must not duplicate topics");
    }

    fn topic(id: &str, label: &str, centroid: Vec<f32>) -> Topic {
        Topic {
            id: id.to_string(),
            words: vec![(label.to_string(), 1.0)],
            label: Some(label.to_string()),
            description: Some("description".to_string()),
            centroid,
        }
    }

    #[test]
    fn exact_duplicate_labels_and_centroids_are_merged() {
        let topics = vec![
            topic("0", "gene editing", vec![1.0, 0.0]),
            topic("1", "gene editing", vec![1.0, 0.0001]),
            topic("2", "cancer immunotherapy", vec![0.0, 1.0]),
        ];

        let deduped = dedupe(topics);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].label.as_deref(), Some("gene editing"));
        assert_eq!(deduped[0].id, "0");
        assert_eq!(deduped[1].id, "1");
    }

    #[test]
    fn similar_centroids_with_dissimilar_labels_are_not_merged() {
        let topics = vec![topic("0", "gene editing", vec![1.0, 0.0]), topic("1", "cancer immunotherapy", vec![1.0, 0.0001])];

        let deduped = dedupe(topics);

        assert_eq!(deduped.len(), 2);
    }

    #[derive(Debug)]
    struct RunOnSentencesLlm;

    #[async_trait]
    impl LlmGateway for RunOnSentencesLlm {
        async fn topic_metadata(&self, _keywords: &[String]) -> LlmMetadataResponse {
            LlmMetadataResponse::ok(
                "this label is way too long".to_string(),
                "a short description".to_string(),
            )
        }

        async fn parent_cluster_metadata(&self, _: &str, _: &str, _: &str, _: &str) -> LlmMetadataResponse {
            unimplemented!()
        }

        async fn parse_intent(&self, _question: &str) -> Result<Intent, LlmError> {
            unimplemented!()
        }

        async fn answer(&self, _user_query: &str, _retrieved_data: &str) -> Result<String, LlmError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn a_label_that_violates_the_topic_invariant_is_stored_as_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactStore::new(dir.path());
        let slice = slice_with_topics(vec![SliceTopic {
            local_id: 0,
            words: vec![("gene".to_string(), 0.9)],
            centroid: vec![1.0; 4],
        }]);
        artifacts.save_artifact("slice-0.bin", &slice).unwrap();

        let state = consolidate(&artifacts, &RunOnSentencesLlm, &["slice-0.bin".to_string()]).await.unwrap();

        assert_eq!(state.topics.len(), 1);
        assert_eq!(state.topics[0].label, None);
        assert_eq!(state.topics[0].description, None);
    }

    #[test]
    fn enforce_topic_invariant_passes_through_valid_metadata() {
        let metadata = LlmMetadataResponse::ok("gene editing".to_string(), "a short description".to_string());
        let checked = enforce_topic_invariant(metadata.clone());
        assert_eq!(checked, metadata);
    }

    #[test]
    fn enforce_topic_invariant_nulls_out_a_too_long_label() {
        let metadata = LlmMetadataResponse::ok("this label is way too long".to_string(), "fine".to_string());
        let checked = enforce_topic_invariant(metadata);
        assert!(checked.is_failure());
    }

    #[test]
    fn enforce_topic_invariant_nulls_out_punctuation_in_the_label() {
        let metadata = LlmMetadataResponse::ok("gene, editing".to_string(), "fine".to_string());
        let checked = enforce_topic_invariant(metadata);
        assert!(checked.is_failure());
    }

    #[test]
    fn enforce_topic_invariant_leaves_an_existing_failure_untouched() {
        let metadata = LlmMetadataResponse::parse_failure("boom", "raw");
        let checked = enforce_topic_invariant(metadata.clone());
        assert_eq!(checked, metadata);
    }
}
