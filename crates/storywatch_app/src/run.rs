use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;
use storywatch_core::{AccountReport, RunReport};
use storywatch_engine::{
    load_account_list, load_state, login_with_session, resolve_targets, run_batch, save_state,
    Clock, Notifier, Pacer, PacingPolicy, ProgressSink, RateWindow, RunContext, RunSettings,
    StoryClient,
};
use storywatch_logging::{watch_info, watch_warn};

use crate::cli::Cli;
use crate::config::AppConfig;

/// External collaborators one run is wired to.
pub struct Services<'a> {
    pub client: &'a dyn StoryClient,
    pub notifier: &'a dyn Notifier,
    pub clock: Arc<dyn Clock>,
}

/// Writes each account's status line as soon as it is known.
struct StatusPrinter<'w> {
    out: &'w mut dyn Write,
    error: Option<io::Error>,
}

impl ProgressSink for StatusPrinter<'_> {
    fn account_finished(&mut self, report: &AccountReport) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = writeln!(self.out, "{}", report.status_line()) {
            self.error = Some(err);
        }
    }
}

/// One complete polling run.
///
/// Status lines go to `out` as each account finishes, the closing summary
/// after the state is saved. Any error returned here is fatal: state is only
/// written when every account has been processed.
pub async fn execute(
    cli: &Cli,
    config: &AppConfig,
    services: Services<'_>,
    out: &mut dyn Write,
) -> anyhow::Result<RunReport> {
    let (jitter_min, jitter_max) = cli.login_jitter()?;

    let targets = load_account_list(&cli.targets).context("cannot read targets")?;
    if targets.is_empty() {
        watch_warn!("No accounts listed in {:?}", cli.targets);
    }
    let mut state = load_state(&cli.state).context("cannot load state")?;
    let notify_set: HashSet<String> = load_account_list(&cli.notify)
        .context("cannot read notify list")?
        .into_iter()
        .collect();

    let mut login_pacer = Pacer::new(
        "login",
        PacingPolicy::jittered(jitter_min, jitter_max),
        services.clock.clone(),
    );
    let origin = login_with_session(
        services.client,
        &config.credentials,
        &cli.session,
        &mut login_pacer,
    )
    .await?;
    watch_info!("Session ready ({:?})", origin);

    let window = cli.requests_per_minute.map(RateWindow::per_minute);
    let paced = |delay| {
        let policy = PacingPolicy::fixed(delay);
        match window {
            Some(window) => policy.with_window(window),
            None => policy,
        }
    };

    let mut lookup_pacer = Pacer::new("lookups", paced(cli.lookup_delay), services.clock.clone());
    let resolved = resolve_targets(
        services.client,
        &targets,
        &mut state.user_id_cache,
        &mut lookup_pacer,
    )
    .await
    .context("cannot resolve account names to ids")?;

    let settings = RunSettings {
        download: cli.download,
        output_dir: cli.out.clone(),
        notify_set,
        recipient: config.smtp.username.clone(),
    };
    let ctx = RunContext {
        client: services.client,
        notifier: services.notifier,
        settings: &settings,
    };
    let mut account_pacer = Pacer::new("accounts", paced(cli.sleep), services.clock);
    let mut printer = StatusPrinter {
        out: &mut *out,
        error: None,
    };
    let report = run_batch(&ctx, &resolved, &mut state, &mut account_pacer, &mut printer).await;
    if let Some(err) = printer.error {
        return Err(err.into());
    }

    save_state(&cli.state, &state).context("cannot save state")?;

    writeln!(out)?;
    writeln!(out, "{}", report.summary_line())?;
    Ok(report)
}
