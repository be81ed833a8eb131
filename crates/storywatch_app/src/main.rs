use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use storywatch_app::{execute, AppConfig, Cli, Services};
use storywatch_core::FATAL_EXIT_CODE;
use storywatch_engine::{ClientSettings, HttpStoryClient, SmtpNotifier, TokioClock};
use storywatch_logging::watch_error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    storywatch_logging::initialize(cli.log_settings());

    if let Err(err) = run(cli).await {
        watch_error!("{:#}", err);
        return ExitCode::from(FATAL_EXIT_CODE);
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    let mut client_settings = ClientSettings::default();
    if let Some(api_base) = cli.api_base.clone().or_else(|| config.api_base.clone()) {
        client_settings.api_base = api_base;
    }
    let client = HttpStoryClient::new(client_settings).context("cannot set up the http client")?;
    let notifier = SmtpNotifier::new(config.smtp.clone()).context("cannot set up mail")?;

    let services = Services {
        client: &client,
        notifier: &notifier,
        clock: Arc::new(TokioClock),
    };
    execute(&cli, &config, services, &mut io::stdout()).await?;
    Ok(())
}
