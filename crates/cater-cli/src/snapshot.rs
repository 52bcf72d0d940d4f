//! # Snapshot File
//!
//! The CLI keeps the whole workflow state in one JSON file holding a
//! [`Snapshot`]. A missing file is an empty store. Writes go to a sibling
//! temporary file that is then renamed over the original, so an interrupted
//! run leaves the previous snapshot intact.

use std::path::{Path, PathBuf};

use cater_workflow::{InMemoryStore, Snapshot, StoreError};
use thiserror::Error;

/// The snapshot file could not be used. Reported with exit code 2.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("cannot read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("snapshot {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("snapshot {path} is inconsistent: {source}")]
    Invalid { path: PathBuf, source: StoreError },

    #[error("cannot write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Load the store from `path`.
pub fn load(path: &Path) -> Result<InMemoryStore, SnapshotError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no snapshot yet, starting empty");
            return Ok(InMemoryStore::new());
        }
        Err(source) => {
            return Err(SnapshotError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let snapshot: Snapshot = serde_json::from_str(&content).map_err(|source| SnapshotError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    InMemoryStore::from_snapshot(snapshot).map_err(|source| SnapshotError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the store back to `path`.
pub fn save(path: &Path, store: &InMemoryStore) -> Result<(), SnapshotError> {
    let write_err = |source| SnapshotError::Write {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_string_pretty(&store.snapshot()).map_err(|e| write_err(e.into()))?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, json).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(write_err)?;
    tracing::debug!(path = %path.display(), "snapshot written");
    Ok(())
}
