//! Atomic read/write of checkpoints and model artifacts on a configured
//! directory (spec §4.2, C2). Every write goes through a sibling temp file
//! and an atomic rename so a reader never observes a partially-written
//! file (spec §5 "Shared-resource policy").

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use observability_deps::tracing::debug;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("artifact {0} not found")]
    NotFound(String),

    #[error("io error on artifact {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize artifact {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: bincode::Error,
    },

    #[error("failed to deserialize artifact {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: bincode::Error,
    },
}

/// A directory used exclusively by a single stage (spec §5: artifact files
/// are written only by the stage that produces them).
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    /// Writes `bytes` to `name` via a temp file in the same directory
    /// followed by an atomic rename, so concurrent readers only ever see
    /// the previous complete file or the new one.
    pub fn save(&self, name: &str, bytes: &[u8]) -> Result<(), Error> {
        std::fs::create_dir_all(&self.dir).map_err(|source| Error::Io {
            name: name.to_string(),
            source,
        })?;

        let tmp_path = self.dir.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
        {
            let mut file = std::fs::File::create(&tmp_path).map_err(|source| Error::Io {
                name: name.to_string(),
                source,
            })?;
            file.write_all(bytes).map_err(|source| Error::Io {
                name: name.to_string(),
                source,
            })?;
            file.sync_all().map_err(|source| Error::Io {
                name: name.to_string(),
                source,
            })?;
        }

        std::fs::rename(&tmp_path, self.path_for(name)).map_err(|source| Error::Io {
            name: name.to_string(),
            source,
        })?;
        debug!(artifact = name, bytes = bytes.len(), "wrote artifact");
        Ok(())
    }

    pub fn load(&self, name: &str) -> Result<Vec<u8>, Error> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(Error::NotFound(name.to_string()));
        }
        std::fs::read(&path).map_err(|source| Error::Io {
            name: name.to_string(),
            source,
        })
    }

    /// Appends a single `\n`-terminated line to `name`, creating it if
    /// necessary. Used to track produced topic-slice artifact paths
    /// (spec §4.7).
    pub fn append_line(&self, name: &str, line: &str) -> Result<(), Error> {
        std::fs::create_dir_all(&self.dir).map_err(|source| Error::Io {
            name: name.to_string(),
            source,
        })?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(name))
            .map_err(|source| Error::Io {
                name: name.to_string(),
                source,
            })?;
        writeln!(file, "{line}").map_err(|source| Error::Io {
            name: name.to_string(),
            source,
        })
    }

    /// Reads all lines appended via [`ArtifactStore::append_line`]. Returns
    /// an empty list if the file does not exist yet.
    pub fn read_lines(&self, name: &str) -> Result<Vec<String>, Error> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&path).map_err(|source| Error::Io {
            name: name.to_string(),
            source,
        })?;
        Ok(contents.lines().map(str::to_string).collect())
    }

    /// Serializes `value` with `bincode` and writes it atomically.
    pub fn save_artifact<T: Serialize>(&self, name: &str, value: &T) -> Result<(), Error> {
        let bytes = bincode::serialize(value).map_err(|source| Error::Encode {
            name: name.to_string(),
            source,
        })?;
        self.save(name, &bytes)
    }

    /// Loads and `bincode`-deserializes an artifact written by
    /// [`ArtifactStore::save_artifact`].
    pub fn load_artifact<T: DeserializeOwned>(&self, name: &str) -> Result<T, Error> {
        let bytes = self.load(name)?;
        bincode::deserialize(&bytes).map_err(|source| Error::Decode {
            name: name.to_string(),
            source,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Checkpoint {
        last_index: usize,
        ids: Vec<String>,
    }

    #[test]
    fn save_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let checkpoint = Checkpoint {
            last_index: 3,
            ids: vec!["a".into(), "b".into()],
        };

        store.save_artifact("checkpoint.bin", &checkpoint).unwrap();
        assert!(store.exists("checkpoint.bin"));

        let loaded: Checkpoint = store.load_artifact("checkpoint.bin").unwrap();
        assert_eq!(loaded, checkpoint);
    }

    #[test]
    fn missing_artifact_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(matches!(store.load("absent"), Err(Error::NotFound(_))));
    }

    #[test]
    fn append_line_accumulates() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.append_line("paths.txt", "slice-0001.bin").unwrap();
        store.append_line("paths.txt", "slice-0002.bin").unwrap();

        assert_eq!(
            store.read_lines("paths.txt").unwrap(),
            vec!["slice-0001.bin".to_string(), "slice-0002.bin".to_string()]
        );
    }

    #[test]
    fn read_lines_of_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(store.read_lines("absent.txt").unwrap().is_empty());
    }
}
