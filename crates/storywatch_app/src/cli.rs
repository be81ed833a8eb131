use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use log::LevelFilter;
use storywatch_logging::LogSettings;

#[derive(Debug, Parser)]
#[command(name = "storywatch")]
#[command(about = "Check accounts for new stories, optionally download them and mail alerts")]
#[command(version)]
pub struct Cli {
    /// File with one account name per line
    #[arg(long)]
    pub targets: PathBuf,

    /// State document remembering cached ids and the last seen story per account
    #[arg(long, default_value = "story_state.json")]
    pub state: PathBuf,

    /// Where the login session is stored between runs
    #[arg(long, default_value = "ig_session.json")]
    pub session: PathBuf,

    /// Download newly detected stories
    #[arg(long)]
    pub download: bool,

    /// Output folder for downloads
    #[arg(long, default_value = "downloads")]
    pub out: PathBuf,

    /// Pause between accounts, in seconds
    #[arg(long, default_value = "0.8", value_parser = parse_seconds)]
    pub sleep: Duration,

    /// File with the accounts whose new stories trigger a mail
    #[arg(long, default_value = "notify_users.txt")]
    pub notify: PathBuf,

    /// Pause after each uncached id lookup, in seconds
    #[arg(long, default_value = "0.3", value_parser = parse_seconds)]
    pub lookup_delay: Duration,

    /// Lower bound of the random wait before logging in, in seconds
    #[arg(long, default_value = "10", value_parser = parse_seconds)]
    pub login_jitter_min: Duration,

    /// Upper bound of the random wait before logging in, in seconds
    #[arg(long, default_value = "60", value_parser = parse_seconds)]
    pub login_jitter_max: Duration,

    /// Cap on id lookups and on story listings, each per minute
    #[arg(long)]
    pub requests_per_minute: Option<u32>,

    /// Override the platform API base URL (also read from STORY_API_BASE)
    #[arg(long)]
    pub api_base: Option<String>,

    /// Also write the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// More log output; repeat for trace
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn log_settings(&self) -> LogSettings {
        let level = match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        LogSettings {
            level,
            log_file: self.log_file.clone(),
        }
    }

    /// Login jitter bounds, rejecting an inverted range.
    pub fn login_jitter(&self) -> anyhow::Result<(Duration, Duration)> {
        anyhow::ensure!(
            self.login_jitter_min <= self.login_jitter_max,
            "--login-jitter-min ({:?}) is larger than --login-jitter-max ({:?})",
            self.login_jitter_min,
            self.login_jitter_max
        );
        Ok((self.login_jitter_min, self.login_jitter_max))
    }
}

fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("{raw:?} is not a number of seconds"))?;
    Duration::try_from_secs_f64(secs).map_err(|err| format!("{raw:?}: {err}"))
}
