use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{StoryId, UserId};

/// Account name to platform user id. Entries are never replaced or removed.
pub type IdentityCache = BTreeMap<String, UserId>;

/// Account name to the highest story id already processed.
pub type WatermarkState = BTreeMap<String, StoryId>;

/// The durable document: identity cache plus per-account watermarks.
///
/// Loaded once at start, mutated in memory, written once at the end.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub user_id_cache: IdentityCache,
    #[serde(default)]
    pub last_seen: WatermarkState,
}

impl PersistedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watermark for `account`; 0 when nothing has been seen yet.
    pub fn watermark(&self, account: &str) -> StoryId {
        self.last_seen.get(account).copied().unwrap_or(0)
    }

    /// Move the watermark forward. Never lowers an existing value.
    pub fn advance_watermark(&mut self, account: &str, next: StoryId) -> StoryId {
        let slot = self.last_seen.entry(account.to_string()).or_insert(0);
        *slot = (*slot).max(next);
        *slot
    }
}
