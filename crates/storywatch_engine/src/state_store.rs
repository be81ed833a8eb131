use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use storywatch_core::{ErrorKind, PersistedState};
use storywatch_logging::{watch_debug, watch_info, watch_warn};
use thiserror::Error;

use crate::persist::{AtomicFileWriter, PersistError};

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("failed to read state file {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("state path {0:?} has no file name")]
    InvalidPath(PathBuf),
    #[error("failed to write state file: {0}")]
    Write(#[from] PersistError),
}

impl StateStoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StateStoreError::Read { .. } => ErrorKind::Configuration,
            _ => ErrorKind::StatePersist,
        }
    }
}

/// Load the state document.
///
/// A missing file or a document that does not parse yields the empty state,
/// dropping whatever progress a corrupt document held. Any other IO failure
/// (permissions, a directory in the way) is returned.
pub fn load_state(path: &Path) -> Result<PersistedState, StateStoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            watch_info!("No state file at {:?}; starting fresh", path);
            return Ok(PersistedState::default());
        }
        Err(source) => {
            return Err(StateStoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    match serde_json::from_slice::<PersistedState>(&bytes) {
        Ok(state) => {
            watch_debug!(
                "Loaded state from {:?}: {} cached ids, {} watermarks",
                path,
                state.user_id_cache.len(),
                state.last_seen.len()
            );
            Ok(state)
        }
        Err(err) => {
            watch_warn!(
                "State file {:?} is not a valid state document ({}); discarding it",
                path,
                err
            );
            Ok(PersistedState::default())
        }
    }
}

/// Overwrite the state document with `state` as indented UTF-8 JSON.
pub fn save_state(path: &Path, state: &PersistedState) -> Result<(), StateStoreError> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| StateStoreError::InvalidPath(path.to_path_buf()))?;
    let mut content = serde_json::to_string_pretty(state)?;
    content.push('\n');

    let written = AtomicFileWriter::for_file(path).write(filename, content)?;
    watch_info!("Saved state to {:?}", written);
    Ok(())
}
