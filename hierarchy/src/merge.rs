use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use litmap_artifacts::ArtifactStore;
use litmap_llm::LlmGateway;
use litmap_types::{Cluster, Embedding, Topic};
use litmap_util::CheckpointedLoop;
use observability_deps::tracing::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::similarity::{cosine_distance, cosine_similarity};

const CHECKPOINT_ARTIFACT: &str = "merge.ckpt";

#[derive(Debug, Error)]
#[error("2D projection failed: {0}")]
pub struct ProjectorError(pub String);

/// The pretrained UMAP-to-2D fit used for cluster coordinates. A genuinely
/// complex statistical fit, so it stays an external collaborator rather
/// than hand-rolled code, the same seam `TopicModel` provides for topic
/// discovery.
#[async_trait]
pub trait Projector2D: std::fmt::Debug + Send + Sync {
    async fn project(&self, centroids: &[Embedding]) -> Result<Vec<(f32, f32)>, ProjectorError>;
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("artifact error: {0}")]
    Artifact(#[from] litmap_artifacts::Error),

    #[error(transparent)]
    Projector(#[from] ProjectorError),

    #[error("merge step referenced unknown cluster {0}")]
    MissingCluster(String),
}

/// Checkpointed after every merge (spec §4.9: "write a checkpoint
/// {clusters, centroids, linkage, last completed merge_id}").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeState {
    pub clusters: HashMap<String, Cluster>,
    pub centroids: HashMap<String, Embedding>,
    pub linkage: Vec<(usize, usize)>,
    pub last_completed_merge: Option<usize>,
}

/// Reads back the checkpoint [`build_hierarchy`] leaves behind, for a
/// later process (the indexer) that only needs the finished clusters and
/// never calls `build_hierarchy` itself.
pub fn load_final_state(artifacts: &ArtifactStore) -> MergeState {
    CheckpointedLoop::<MergeState>::resume(artifacts, CHECKPOINT_ARTIFACT).into_state()
}

/// Stage H2 (spec C9): initializes one leaf cluster per deduped topic,
/// computes the average-linkage merge order once, then replays merges from
/// the last checkpoint forward.
pub async fn build_hierarchy(
    artifacts: &ArtifactStore,
    llm: &dyn LlmGateway,
    projector: &dyn Projector2D,
    topics: &[Topic],
) -> Result<MergeState, MergeError> {
    let mut loop_state = CheckpointedLoop::<MergeState>::resume(artifacts, CHECKPOINT_ARTIFACT);

    if loop_state.state().clusters.is_empty() && !topics.is_empty() {
        initialize_leaves(loop_state.state_mut(), projector, topics).await?;
        let centroids: Vec<Embedding> = topics.iter().map(|topic| topic.centroid.clone()).collect();
        loop_state.state_mut().linkage = agglomerative_average_linkage(&centroids);
        loop_state.checkpoint()?;
    }

    let leaf_ids: Vec<String> = topics.iter().map(|topic| topic.id.clone()).collect();
    let linkage = loop_state.state().linkage.clone();
    let start = loop_state.state().last_completed_merge.map(|step| step + 1).unwrap_or(0);

    for (step, &(left_idx, right_idx)) in linkage.iter().enumerate().skip(start) {
        let left_id = resolve_id(&leaf_ids, left_idx);
        let right_id = resolve_id(&leaf_ids, right_idx);
        let parent = merge_pair(loop_state.state(), llm, &left_id, &right_id, step).await?;

        loop_state.state_mut().centroids.insert(parent.id.clone(), parent.centroid.clone());
        loop_state.state_mut().clusters.insert(parent.id.clone(), parent);
        loop_state.state_mut().last_completed_merge = Some(step);
        loop_state.checkpoint()?;
    }

    if !linkage.is_empty() && loop_state.state().last_completed_merge == Some(linkage.len() - 1) {
        compute_pairwise_similarity(loop_state.state_mut());
        loop_state.checkpoint()?;
    }

    Ok(loop_state.into_state())
}

async fn initialize_leaves(state: &mut MergeState, projector: &dyn Projector2D, topics: &[Topic]) -> Result<(), MergeError> {
    let centroids: Vec<Embedding> = topics.iter().map(|topic| topic.centroid.clone()).collect();
    let coordinates = projector.project(&centroids).await?;

    for (topic, (x, y)) in topics.iter().zip(coordinates) {
        let cluster = Cluster {
            id: topic.id.clone(),
            label: topic.label.clone(),
            description: topic.description.clone(),
            topic_words: topic.word_set().into_iter().map(str::to_string).collect(),
            is_leaf: true,
            depth: 0,
            path: topic.id.clone(),
            x,
            y,
            children: Vec::new(),
            size: 1,
            centroid: topic.centroid.clone(),
            pairwise_similarity: HashMap::new(),
        };
        state.centroids.insert(topic.id.clone(), topic.centroid.clone());
        state.clusters.insert(topic.id.clone(), cluster);
    }

    Ok(())
}

async fn merge_pair(state: &MergeState, llm: &dyn LlmGateway, left_id: &str, right_id: &str, merge_step: usize) -> Result<Cluster, MergeError> {
    let left = state.clusters.get(left_id).ok_or_else(|| MergeError::MissingCluster(left_id.to_string()))?;
    let right = state.clusters.get(right_id).ok_or_else(|| MergeError::MissingCluster(right_id.to_string()))?;

    let parent_id = format!("cluster_{merge_step}");
    let size = left.size + right.size;

    let metadata = llm
        .parent_cluster_metadata(
            left.label.as_deref().unwrap_or(""),
            left.description.as_deref().unwrap_or(""),
            right.label.as_deref().unwrap_or(""),
            right.description.as_deref().unwrap_or(""),
        )
        .await;
    if metadata.is_failure() {
        warn!(cluster = %parent_id, error = ?metadata.error, "parent cluster metadata synthesis failed");
    }

    Ok(Cluster {
        id: parent_id.clone(),
        label: metadata.label,
        description: metadata.description,
        topic_words: left.topic_words.union(&right.topic_words).cloned().collect(),
        is_leaf: false,
        depth: left.depth.max(right.depth) + 1,
        path: format!("{parent_id}/{}/{}", left.path, right.path),
        x: size_weighted_mean(left.x, left.size, right.x, right.size),
        y: size_weighted_mean(left.y, left.size, right.y, right.size),
        children: vec![left_id.to_string(), right_id.to_string()],
        size,
        centroid: unweighted_mean_centroid(&left.centroid, &right.centroid),
        pairwise_similarity: HashMap::new(),
    })
}

fn size_weighted_mean(a: f32, a_size: u32, b: f32, b_size: u32) -> f32 {
    (a * a_size as f32 + b * b_size as f32) / (a_size + b_size) as f32
}

fn unweighted_mean_centroid(a: &Embedding, b: &Embedding) -> Embedding {
    a.iter().zip(b).map(|(x, y)| (x + y) / 2.0).collect()
}

/// Resolves a linkage index to a cluster id: indices below `leaf_ids.len()`
/// are original topic ids, indices at or above it are synthetic merges
/// named `cluster_{k}` where `k` is the merge step that produced them
/// (spec §4.9 "`cluster_{k}` for synthetic ones").
fn resolve_id(leaf_ids: &[String], index: usize) -> String {
    if index < leaf_ids.len() {
        leaf_ids[index].clone()
    } else {
        format!("cluster_{}", index - leaf_ids.len())
    }
}

/// Average-linkage agglomerative clustering over cosine distance (spec
/// §4.9: "no threshold"), returning a scipy-style linkage list of length
/// `N-1`: entry `k` is the pair merged at step `k`, and its synthetic index
/// is `N+k`. Implemented via the Lance-Williams update formula for UPGMA so
/// inter-cluster distances never need recomputing from raw members.
pub fn agglomerative_average_linkage(centroids: &[Embedding]) -> Vec<(usize, usize)> {
    let n = centroids.len();
    if n <= 1 {
        return Vec::new();
    }

    let mut active: Vec<usize> = (0..n).collect();
    let mut sizes: HashMap<usize, usize> = (0..n).map(|i| (i, 1)).collect();
    let mut distances: HashMap<(usize, usize), f32> = HashMap::new();
    for i in 0..n {
        for j in (i + 1)..n {
            distances.insert((i, j), cosine_distance(&centroids[i], &centroids[j]));
        }
    }

    let mut linkage = Vec::with_capacity(n - 1);

    for step in 0..(n - 1) {
        let mut best: Option<(usize, usize, f32)> = None;
        for (position, &a) in active.iter().enumerate() {
            for &b in &active[position + 1..] {
                let distance = distances[&pair_key(a, b)];
                if best.map_or(true, |(_, _, best_distance)| distance < best_distance) {
                    best = Some((a, b, distance));
                }
            }
        }
        let (i, j, _) = best.expect("at least two active clusters remain while step < n-1");

        let new_id = n + step;
        let size_i = sizes[&i];
        let size_j = sizes[&j];
        let new_size = size_i + size_j;

        for &k in &active {
            if k == i || k == j {
                continue;
            }
            let d_ik = distances[&pair_key(i, k)];
            let d_jk = distances[&pair_key(j, k)];
            let updated = (size_i as f32 * d_ik + size_j as f32 * d_jk) / new_size as f32;
            distances.insert(pair_key(new_id, k), updated);
        }

        active.retain(|&x| x != i && x != j);
        active.push(new_id);
        sizes.insert(new_id, new_size);

        linkage.push((i.min(j), i.max(j)));
    }

    linkage
}

fn pair_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn compute_pairwise_similarity(state: &mut MergeState) {
    let ids: Vec<String> = state.clusters.keys().cloned().collect();

    for i in 0..ids.len() {
        for j in 0..ids.len() {
            if i == j {
                continue;
            }
            let similarity = cosine_similarity(&state.centroids[&ids[i]], &state.centroids[&ids[j]]);
            state.clusters.get_mut(&ids[i]).unwrap().pairwise_similarity.insert(ids[j].clone(), similarity);
        }
    }
}

/// Verifies the invariants spec §4.9 calls out explicitly: exactly one
/// rootless cluster, every non-leaf's two children present in the map,
/// every path starting with the root's id.
pub fn check_invariants(clusters: &HashMap<String, Cluster>) -> Result<(), String> {
    let mut is_child: HashSet<&str> = HashSet::new();
    for cluster in clusters.values() {
        if !cluster.is_valid_children_count() {
            return Err(format!("cluster {} has an invalid children count", cluster.id));
        }
        for child in &cluster.children {
            if !clusters.contains_key(child) {
                return Err(format!("cluster {} references missing child {child}", cluster.id));
            }
            is_child.insert(child.as_str());
        }
    }

    let roots: Vec<&str> = clusters.keys().map(String::as_str).filter(|id| !is_child.contains(id)).collect();
    if roots.len() != 1 {
        return Err(format!("expected exactly one rootless cluster, found {}", roots.len()));
    }
    let root = roots[0];

    for cluster in clusters.values() {
        if !cluster.path.starts_with(root) {
            return Err(format!("cluster {} path {} does not start with root {root}", cluster.id, cluster.path));
        }
    }

    Ok(())
}
