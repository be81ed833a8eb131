#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use storywatch_core::{StoryId, UserId};
use storywatch_engine::{
    ClientError, FailureKind, ManualClock, Notification, Notifier, NotifyError, Pacer,
    PacingPolicy, RawStory, StoryClient,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Restore,
    Verify,
    Login,
    UserId(String),
    ListStories(UserId),
    Download(StoryId),
}

/// In-memory platform: canned ids and stories, optional failures, call log.
#[derive(Default)]
pub struct FakeClient {
    user_ids: HashMap<String, String>,
    failing_lookups: HashSet<String>,
    stories: HashMap<UserId, Vec<RawStory>>,
    failing_fetches: HashSet<UserId>,
    failing_downloads: HashSet<StoryId>,
    accept_stored_session: bool,
    fail_login: bool,
    calls: Mutex<Vec<Call>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, account: &str, raw_id: &str) -> Self {
        self.user_ids.insert(account.to_string(), raw_id.to_string());
        self
    }

    pub fn failing_lookup(mut self, account: &str) -> Self {
        self.failing_lookups.insert(account.to_string());
        self
    }

    pub fn with_stories(mut self, user_id: UserId, ids: &[StoryId]) -> Self {
        self.stories
            .insert(user_id, ids.iter().map(|id| RawStory::with_pk(*id)).collect());
        self
    }

    pub fn with_raw_stories(mut self, user_id: UserId, raw: Vec<RawStory>) -> Self {
        self.stories.insert(user_id, raw);
        self
    }

    pub fn failing_fetch(mut self, user_id: UserId) -> Self {
        self.failing_fetches.insert(user_id);
        self
    }

    pub fn failing_download(mut self, story_id: StoryId) -> Self {
        self.failing_downloads.insert(story_id);
        self
    }

    pub fn accepting_stored_session(mut self) -> Self {
        self.accept_stored_session = true;
        self
    }

    pub fn failing_login(mut self) -> Self {
        self.fail_login = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn lookups(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::UserId(account) => Some(account),
                _ => None,
            })
            .collect()
    }

    pub fn downloads(&self) -> Vec<StoryId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Download(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl StoryClient for FakeClient {
    async fn restore_session(&self, material: &[u8]) -> Result<(), ClientError> {
        self.record(Call::Restore);
        if material.is_empty() {
            return Err(ClientError::new(FailureKind::UnexpectedResponse, "empty"));
        }
        Ok(())
    }

    async fn verify_session(&self) -> Result<(), ClientError> {
        self.record(Call::Verify);
        if self.accept_stored_session {
            Ok(())
        } else {
            Err(ClientError::new(FailureKind::Auth, "login_required"))
        }
    }

    async fn login(&self, _username: &str, _password: &str) -> Result<(), ClientError> {
        self.record(Call::Login);
        if self.fail_login {
            Err(ClientError::new(FailureKind::Auth, "bad password"))
        } else {
            Ok(())
        }
    }

    fn export_session(&self) -> Result<Vec<u8>, ClientError> {
        Ok(b"{\"authorization\":\"Bearer fresh\"}".to_vec())
    }

    async fn user_id(&self, account: &str) -> Result<String, ClientError> {
        self.record(Call::UserId(account.to_string()));
        if self.failing_lookups.contains(account) {
            return Err(ClientError::new(FailureKind::HttpStatus(429), "rate limited"));
        }
        self.user_ids
            .get(account)
            .cloned()
            .ok_or_else(|| ClientError::new(FailureKind::HttpStatus(404), "user not found"))
    }

    async fn list_stories(&self, user_id: UserId) -> Result<Vec<RawStory>, ClientError> {
        self.record(Call::ListStories(user_id));
        if self.failing_fetches.contains(&user_id) {
            return Err(ClientError::new(FailureKind::HttpStatus(500), "server error"));
        }
        Ok(self.stories.get(&user_id).cloned().unwrap_or_default())
    }

    async fn download_story(&self, story_id: StoryId, dir: &Path) -> Result<PathBuf, ClientError> {
        self.record(Call::Download(story_id));
        if self.failing_downloads.contains(&story_id) {
            return Err(ClientError::new(FailureKind::Network, "connection reset"));
        }
        let path = dir.join(format!("{story_id}.jpg"));
        std::fs::write(&path, story_id.to_string())
            .map_err(|err| ClientError::new(FailureKind::Io, err.to_string()))?;
        Ok(path)
    }
}

/// Notifier that records what it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    fail: bool,
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.fail {
            Err(NotifyError::Transport("535 authentication failed".to_string()))
        } else {
            Ok(())
        }
    }
}

pub fn manual_pacer(policy: PacingPolicy) -> (Pacer, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let pacer = Pacer::new("test", policy, clock.clone());
    (pacer, clock)
}

pub fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value)
}
