use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use storywatch_core::{StoryId, StoryItem, UserId};

/// Everything the run needs from the social platform.
///
/// Session material is an opaque blob: the caller persists and restores it
/// without looking inside.
#[async_trait::async_trait]
pub trait StoryClient: Send + Sync {
    /// Load previously exported session material.
    async fn restore_session(&self, material: &[u8]) -> Result<(), ClientError>;
    /// Trial authentication against the current session.
    async fn verify_session(&self) -> Result<(), ClientError>;
    /// Fresh username/password login.
    async fn login(&self, username: &str, password: &str) -> Result<(), ClientError>;
    /// Session material to persist for the next run.
    fn export_session(&self) -> Result<Vec<u8>, ClientError>;
    /// Look up the platform id of `account`, as the platform spells it.
    async fn user_id(&self, account: &str) -> Result<String, ClientError>;
    /// Currently active stories of a user.
    async fn list_stories(&self, user_id: UserId) -> Result<Vec<RawStory>, ClientError>;
    /// Download one story into `dir`, returning the written file.
    async fn download_story(&self, story_id: StoryId, dir: &Path) -> Result<PathBuf, ClientError>;
}

/// A story as the platform returns it. Ids show up as numbers or strings,
/// under `pk` or `id`, so both are kept raw until [`normalize_story`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawStory {
    #[serde(default)]
    pub pk: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

impl RawStory {
    pub fn with_pk(pk: impl Into<Value>) -> Self {
        Self {
            pk: Some(pk.into()),
            id: None,
        }
    }

    pub fn with_id(id: impl Into<Value>) -> Self {
        Self {
            pk: None,
            id: Some(id.into()),
        }
    }
}

/// Reduce a platform story to `{id, account}`.
///
/// `pk` wins over `id`. Each accepts a non-negative integer or a string of
/// digits; `id` may also be `"<pk>_<owner id>"`. Returns `None` when neither
/// field carries a usable id.
pub fn normalize_story(raw: &RawStory, account: &str) -> Option<StoryItem> {
    let from_pk = raw.pk.as_ref().and_then(numeric_id);
    let from_id = || {
        raw.id.as_ref().and_then(|value| {
            numeric_id(value).or_else(|| {
                let (pk, _owner) = value.as_str()?.split_once('_')?;
                digits(pk)
            })
        })
    };
    from_pk
        .or_else(from_id)
        .map(|id| StoryItem::new(id, account))
}

fn numeric_id(value: &Value) -> Option<StoryId> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => digits(s),
        _ => None,
    }
}

fn digits(s: &str) -> Option<StoryId> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ClientError {
    pub kind: FailureKind,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Auth,
    HttpStatus(u16),
    Timeout,
    Network,
    UnexpectedResponse,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Auth => write!(f, "authentication failed"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::UnexpectedResponse => write!(f, "unexpected response"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Io => write!(f, "io error"),
        }
    }
}
