use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use storywatch_core::ErrorKind;
use storywatch_logging::{watch_info, watch_warn};
use thiserror::Error;

use crate::client::{ClientError, StoryClient};
use crate::pacing::Pacer;
use crate::persist::{AtomicFileWriter, PersistError};

/// Platform login credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// The persisted session passed trial authentication.
    Reused,
    /// A fresh login was performed and its session persisted.
    Fresh,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("login failed: {0}")]
    Login(#[from] ClientError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Login
    }
}

/// Problems with the stored session file; all of them end in a fresh login.
#[derive(Debug, Error)]
enum SessionFileError {
    #[error("cannot read session file: {0}")]
    Read(io::Error),
    #[error("session path {0:?} has no file name")]
    InvalidPath(PathBuf),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("cannot write session file: {0}")]
    Write(#[from] PersistError),
}

/// Authenticate `client`, preferring the session stored at `session_path`.
///
/// Any failure while reusing the stored session falls back to a fresh login.
/// Only a failed fresh login is an error; failing to store the new session is
/// logged and tolerated.
pub async fn login_with_session(
    client: &dyn StoryClient,
    credentials: &Credentials,
    session_path: &Path,
    pacer: &mut Pacer,
) -> Result<SessionOrigin, SessionError> {
    pacer.pause().await;

    match try_reuse(client, session_path).await {
        Ok(true) => {
            watch_info!("Reusing stored session from {:?}", session_path);
            return Ok(SessionOrigin::Reused);
        }
        Ok(false) => {}
        Err(reason) => {
            watch_warn!(
                "Stored session at {:?} is unusable ({}); logging in again",
                session_path,
                reason
            );
        }
    }

    client
        .login(&credentials.username, &credentials.password)
        .await?;

    match client.export_session() {
        Ok(material) => {
            if let Err(err) = write_session(session_path, &material) {
                watch_warn!("Failed to store session at {:?}: {}", session_path, err);
            }
        }
        Err(err) => watch_warn!("Failed to export session: {}", err),
    }
    Ok(SessionOrigin::Fresh)
}

/// `Ok(false)` when there is no stored session to try.
async fn try_reuse(client: &dyn StoryClient, session_path: &Path) -> Result<bool, SessionFileError> {
    let material = match fs::read(session_path) {
        Ok(material) => material,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(SessionFileError::Read(err)),
    };
    client.restore_session(&material).await?;
    client.verify_session().await?;
    Ok(true)
}

fn write_session(path: &Path, material: &[u8]) -> Result<(), SessionFileError> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| SessionFileError::InvalidPath(path.to_path_buf()))?;
    AtomicFileWriter::for_file(path).write(filename, material)?;
    Ok(())
}
