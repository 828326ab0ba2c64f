use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cli::{App, Commands};
use crate::commands::Context;
use crate::config::Settings;

mod cli;
mod commands;
mod config;
mod fixture;
mod logging;
mod progress;
mod sample;

const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let app = App::parse();
    logging::init(app.verbose, app.quiet);

    let result = dispatch(app).await;
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if commands::is_cancelled(&e) => {
            eprintln!("cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(app: App) -> anyhow::Result<()> {
    if let Commands::Completions(arg) = &app.cmd {
        commands::completions(arg.clone());
        return Ok(());
    }

    let mut settings = Settings::load(app.config.as_deref())?;
    if let Commands::Download(arg) = &app.cmd
        && arg.no_cache_bust
    {
        settings.engine.cache_bust = false;
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    let ctx = Context::new(settings, cancel, app.quiet)?;
    match app.cmd {
        Commands::Ping(arg) => commands::ping(&ctx, arg).await.map(drop),
        Commands::Download(arg) => commands::download(&ctx, arg).await.map(drop),
        Commands::Upload(arg) => commands::upload(&ctx, arg).await.map(drop),
        Commands::Run(arg) => commands::run(&ctx, arg).await,
        Commands::Resolve(arg) => commands::resolve(&ctx, arg).await,
        Commands::Auth(cmd) => commands::auth(&ctx, cmd).await,
        Commands::Fixture(arg) => commands::fixture(&ctx, arg).await.map(drop),
        Commands::Completions(_) => Ok(()),
    }
}
