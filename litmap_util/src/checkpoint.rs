use litmap_artifacts::ArtifactStore;
use observability_deps::tracing::warn;
use serde::{de::DeserializeOwned, Serialize};

/// A generic checkpointed for-each loop over a plain, serializable state
/// (spec §9 "Checkpointed loops" — state holds only ids, counters, and
/// opaque matrices; never a closure or handle). Used by Stage H1, H2 and X.
pub struct CheckpointedLoop<'a, S> {
    store: &'a ArtifactStore,
    artifact_name: String,
    state: S,
}

impl<'a, S> CheckpointedLoop<'a, S>
where
    S: Serialize + DeserializeOwned + Default,
{
    /// Loads the last persisted state for `artifact_name`, or `S::default()`
    /// if this is the first run.
    pub fn resume(store: &'a ArtifactStore, artifact_name: impl Into<String>) -> Self {
        let artifact_name = artifact_name.into();
        let state = store.load_artifact(&artifact_name).unwrap_or_else(|_| {
            warn!(artifact = %artifact_name, "no checkpoint found, starting fresh");
            S::default()
        });
        Self {
            store,
            artifact_name,
            state,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Persists the current state atomically. Callers invoke this after
    /// every completed step (spec §4.8 "checkpoint after each artifact",
    /// §4.9 "after every merge") so a crash mid-run resumes exactly after
    /// the last completed step.
    pub fn checkpoint(&self) -> Result<(), litmap_artifacts::Error> {
        self.store.save_artifact(&self.artifact_name, &self.state)
    }

    pub fn into_state(self) -> S {
        self.state
    }
}
