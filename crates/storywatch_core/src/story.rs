/// Numeric identifier the platform assigns to an account.
pub type UserId = u64;

/// Identifier of a single story item. Higher means more recent.
pub type StoryId = u64;

/// A story reduced to what change detection needs: its id and owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoryItem {
    pub id: StoryId,
    pub account: String,
}

impl StoryItem {
    pub fn new(id: StoryId, account: impl Into<String>) -> Self {
        Self {
            id,
            account: account.into(),
        }
    }
}
