use std::collections::{HashMap, HashSet};
use std::time::Duration;

use litmap_store::StoreClient;
use litmap_types::Cluster;
use observability_deps::tracing::info;
use serde_json::{json, Value};
use thiserror::Error;

const SCROLL_SIZE: usize = 500;
const SCROLL_KEEP_ALIVE: Duration = Duration::from_secs(600);

#[derive(Debug, Error)]
pub enum PathRepairError {
    #[error("store error: {0}")]
    Store(#[from] litmap_store::StoreError),

    #[error("cluster {0} missing required field {1}")]
    MissingField(String, &'static str),
}

#[derive(Debug, Clone)]
struct ClusterRow {
    id: String,
    depth: u32,
    children: Vec<String>,
}

/// One-off path-reconstruction migration (spec §4.10 "Path repair", O3),
/// kept separate from the `children`-based path `hierarchy::merge`
/// computes at write time. Scans every cluster, builds child->parent from
/// `children`, falls back to depth-ordered inference when that mapping is
/// empty, then recomputes and bulk-updates `path` for every cluster.
pub async fn repair_paths(store: &dyn StoreClient, index: &str) -> Result<usize, PathRepairError> {
    let rows = scan_clusters(store, index).await?;

    let mut child_to_parent = build_child_to_parent(&rows);
    if child_to_parent.is_empty() {
        child_to_parent = infer_child_to_parent_by_depth(&rows);
    }

    let mut updated = 0;
    for row in &rows {
        let path = walk_to_root(&row.id, &child_to_parent);
        let path = Cluster::truncate_path_for_storage(&path);
        store.update(index, &row.id, json!({ "path": path })).await?;
        updated += 1;
    }

    info!(updated, "cluster paths repaired");
    Ok(updated)
}

async fn scan_clusters(store: &dyn StoreClient, index: &str) -> Result<Vec<ClusterRow>, PathRepairError> {
    let query = json!({ "match_all": {} });
    let mut page = store.search(index, query, SCROLL_SIZE, None).await?;

    let mut rows = Vec::new();
    loop {
        for (id, source) in std::mem::take(&mut page.hits) {
            rows.push(parse_row(id, source)?);
        }

        let Some(cursor) = page.scroll_cursor.clone() else {
            break;
        };
        let next = store.scroll(&cursor, SCROLL_KEEP_ALIVE).await?;
        if next.hits.is_empty() {
            store.clear_scroll(&cursor).await?;
            break;
        }
        page = next;
    }
    Ok(rows)
}

fn parse_row(id: String, source: Value) -> Result<ClusterRow, PathRepairError> {
    let depth = source["depth"].as_u64().ok_or_else(|| PathRepairError::MissingField(id.clone(), "depth"))? as u32;
    let children = source["children"]
        .as_array()
        .map(|values| values.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    Ok(ClusterRow { id, depth, children })
}

fn build_child_to_parent(rows: &[ClusterRow]) -> HashMap<String, String> {
    let mut child_to_parent = HashMap::new();
    for row in rows {
        for child in &row.children {
            child_to_parent.insert(child.clone(), row.id.clone());
        }
    }
    child_to_parent
}

/// Fallback heuristic (O3): when `children` is empty, assume depth d+1
/// clusters are children of depth d clusters, assigning every cluster at a
/// depth to the first cluster found at the depth above it when more than
/// one candidate parent exists.
fn infer_child_to_parent_by_depth(rows: &[ClusterRow]) -> HashMap<String, String> {
    let mut by_depth: HashMap<u32, Vec<&str>> = HashMap::new();
    for row in rows {
        by_depth.entry(row.depth).or_default().push(row.id.as_str());
    }

    let mut depths: Vec<u32> = by_depth.keys().copied().collect();
    depths.sort_unstable_by(|a, b| b.cmp(a));

    let mut child_to_parent = HashMap::new();
    for window in depths.windows(2) {
        let (parent_depth, child_depth) = (window[0], window[1]);
        let Some(&parent_id) = by_depth[&parent_depth].first() else {
            continue;
        };
        for &child_id in &by_depth[&child_depth] {
            child_to_parent.insert(child_id.to_string(), parent_id.to_string());
        }
    }
    child_to_parent
}

fn walk_to_root(cluster_id: &str, child_to_parent: &HashMap<String, String>) -> String {
    let mut path = vec![cluster_id.to_string()];
    let mut current = cluster_id.to_string();
    let mut seen = HashSet::new();
    seen.insert(current.clone());

    while let Some(parent) = child_to_parent.get(&current) {
        if !seen.insert(parent.clone()) {
            break;
        }
        path.insert(0, parent.clone());
        current = parent.clone();
    }
    path.join("/")
}
