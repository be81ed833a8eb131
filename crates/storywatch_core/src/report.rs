use std::path::PathBuf;

use crate::StoryId;

/// Outcome of polling one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountStatus {
    /// Listing failed; the watermark was left alone.
    FetchFailed { reason: String },
    /// The account has no active stories.
    NoActiveStories,
    /// Stories exist but none carried a usable id.
    UnreadableIds,
    /// Everything active was already seen.
    NoNewStories,
    /// `count` stories above the watermark were found.
    NewStories { count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationOutcome {
    #[default]
    NotRequested,
    Sent,
    Failed,
}

/// Per-account line of the run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountReport {
    pub account: String,
    pub status: AccountStatus,
    pub new_ids: Vec<StoryId>,
    pub downloaded: Vec<PathBuf>,
    pub failed_downloads: Vec<StoryId>,
    pub notification: NotificationOutcome,
}

impl AccountReport {
    pub fn new(account: impl Into<String>, status: AccountStatus) -> Self {
        Self {
            account: account.into(),
            status,
            new_ids: Vec::new(),
            downloaded: Vec::new(),
            failed_downloads: Vec::new(),
            notification: NotificationOutcome::NotRequested,
        }
    }

    pub fn has_new(&self) -> bool {
        matches!(self.status, AccountStatus::NewStories { .. })
    }

    /// Most recent successful download, used as the mail attachment.
    pub fn last_download(&self) -> Option<&PathBuf> {
        self.downloaded.last()
    }

    /// The single user-facing line printed for this account.
    pub fn status_line(&self) -> String {
        let name = &self.account;
        match &self.status {
            AccountStatus::FetchFailed { reason } => {
                format!("@{name}: failed fetching stories ({reason})")
            }
            AccountStatus::NoActiveStories => format!("@{name}: no active stories"),
            AccountStatus::UnreadableIds => {
                format!("@{name}: stories found, but couldn't read story ids")
            }
            AccountStatus::NoNewStories => {
                format!("@{name}: no new stories since last check")
            }
            AccountStatus::NewStories { count } => {
                format!("@{name}: NEW stories detected ({count} items)")
            }
        }
    }
}

/// Everything that happened during one pass over the target list, in target order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunReport {
    pub accounts: Vec<AccountReport>,
}

impl RunReport {
    pub fn push(&mut self, report: AccountReport) {
        self.accounts.push(report);
    }

    pub fn any_new(&self) -> bool {
        self.accounts.iter().any(AccountReport::has_new)
    }

    pub fn notifications_sent(&self) -> usize {
        self.accounts
            .iter()
            .filter(|a| a.notification == NotificationOutcome::Sent)
            .count()
    }

    pub fn summary_line(&self) -> &'static str {
        if self.any_new() {
            "Done: new stories found."
        } else {
            "Done: no new stories found."
        }
    }
}
