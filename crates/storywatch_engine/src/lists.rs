use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use storywatch_core::{parse_account_lines, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ListError {
    #[error("file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
}

impl ListError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Read a newline-delimited account list (targets or notify recipients).
pub fn load_account_list(path: &Path) -> Result<Vec<String>, ListError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(parse_account_lines(&raw)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(ListError::NotFound(path.to_path_buf()))
        }
        Err(source) => Err(ListError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}
