use std::collections::HashSet;
use std::path::PathBuf;

use storywatch_core::{
    detect, AccountReport, AccountStatus, ErrorKind, NotificationOutcome, PersistedState, Policy,
    RunReport, StoryItem,
};
use storywatch_logging::{watch_debug, watch_error, watch_info, watch_warn};

use crate::client::{normalize_story, StoryClient};
use crate::notify::{Notification, Notifier};
use crate::pacing::Pacer;
use crate::persist::ensure_output_dir;
use crate::resolve::ResolvedTarget;

/// Knobs for one pass over the targets.
#[derive(Debug, Clone, Default)]
pub struct RunSettings {
    /// Download new stories into `output_dir/<account>/`.
    pub download: bool,
    pub output_dir: PathBuf,
    /// Accounts whose new stories trigger a mail.
    pub notify_set: HashSet<String>,
    /// Mail recipient for every notification.
    pub recipient: String,
}

/// External collaborators for a run.
pub struct RunContext<'a> {
    pub client: &'a dyn StoryClient,
    pub notifier: &'a dyn Notifier,
    pub settings: &'a RunSettings,
}

/// Receives each account's report as soon as that account is done.
pub trait ProgressSink {
    fn account_finished(&mut self, report: &AccountReport);
}

impl<F> ProgressSink for F
where
    F: FnMut(&AccountReport),
{
    fn account_finished(&mut self, report: &AccountReport) {
        self(report)
    }
}

/// Poll every target once, in order, applying side effects and advancing watermarks.
///
/// Watermarks move as soon as an account's stories were listed, whatever
/// happens to the downloads and the notification afterwards, so a failed
/// side effect is never retried on a later run. `sink` sees every account
/// before the next one starts; `pacer` inserts the inter-account pause.
pub async fn run_batch(
    ctx: &RunContext<'_>,
    targets: &[ResolvedTarget],
    state: &mut PersistedState,
    pacer: &mut Pacer,
    sink: &mut dyn ProgressSink,
) -> RunReport {
    let mut report = RunReport::default();
    for target in targets {
        pacer.acquire().await;
        let account = process_account(ctx, target, state).await;
        watch_debug!("@{} finished: {:?}", target.account, account.status);
        sink.account_finished(&account);
        report.push(account);
        pacer.pause().await;
    }
    report
}

async fn process_account(
    ctx: &RunContext<'_>,
    target: &ResolvedTarget,
    state: &mut PersistedState,
) -> AccountReport {
    let account = target.account.as_str();

    let raw = match ctx.client.list_stories(target.user_id).await {
        Ok(raw) => raw,
        Err(err) => {
            on_error(ErrorKind::Fetch, account, &err);
            return AccountReport::new(
                account,
                AccountStatus::FetchFailed {
                    reason: err.to_string(),
                },
            );
        }
    };
    if raw.is_empty() {
        return AccountReport::new(account, AccountStatus::NoActiveStories);
    }

    let items: Vec<StoryItem> = raw
        .iter()
        .filter_map(|story| {
            let item = normalize_story(story, account);
            if item.is_none() {
                watch_debug!("@{}: dropping story without a usable id: {:?}", account, story);
            }
            item
        })
        .collect();
    if items.is_empty() {
        return AccountReport::new(account, AccountStatus::UnreadableIds);
    }

    let delta = detect(items.iter().map(|item| item.id), state.watermark(account));
    if delta.is_empty() {
        state.advance_watermark(account, delta.next_watermark);
        return AccountReport::new(account, AccountStatus::NoNewStories);
    }

    let mut report = AccountReport::new(
        account,
        AccountStatus::NewStories {
            count: delta.new_ids.len(),
        },
    );
    report.new_ids = delta.new_ids.clone();

    if ctx.settings.download {
        download_new(ctx, account, &delta.new_ids, &mut report).await;
    }

    if ctx.settings.notify_set.contains(account) {
        let notification = Notification::new_story(
            account,
            &ctx.settings.recipient,
            report.last_download().cloned(),
        );
        report.notification = match ctx.notifier.send(&notification).await {
            Ok(()) => NotificationOutcome::Sent,
            Err(err) => {
                on_error(err.kind(), account, &err);
                NotificationOutcome::Failed
            }
        };
    }

    let watermark = state.advance_watermark(account, delta.next_watermark);
    watch_info!("@{}: watermark now {}", account, watermark);
    report
}

async fn download_new(
    ctx: &RunContext<'_>,
    account: &str,
    new_ids: &[u64],
    report: &mut AccountReport,
) {
    let dir = ctx.settings.output_dir.join(account);
    if let Err(err) = ensure_output_dir(&dir) {
        // Every download would fail the same way.
        on_error(ErrorKind::Download, account, &err);
        report.failed_downloads.extend_from_slice(new_ids);
        return;
    }

    for &story_id in new_ids {
        match ctx.client.download_story(story_id, &dir).await {
            Ok(path) => {
                watch_info!("  downloaded: {}", path.display());
                report.downloaded.push(path);
            }
            Err(err) => {
                on_error(ErrorKind::Download, account, &format!("story {story_id}: {err}"));
                report.failed_downloads.push(story_id);
            }
        }
    }
}

/// Log a per-account failure according to its policy.
fn on_error(kind: ErrorKind, account: &str, err: &dyn std::fmt::Display) {
    match kind.policy() {
        Policy::SkipAccount => {
            watch_warn!("@{}: {} ({}); skipping this account", account, kind, err)
        }
        Policy::ContinueBatch => {
            watch_warn!("@{}: {} ({}); continuing", account, kind, err)
        }
        Policy::LogOnly => watch_warn!("@{}: {} ({})", account, kind, err),
        Policy::Abort => watch_error!("@{}: {} ({})", account, kind, err),
    }
}
