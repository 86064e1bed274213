mod account;
mod cli;
mod config;
mod remote;
mod session;
mod tasks;
mod tui;

use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::ConfigCommand;

/// Entry point wiring the CLI to the remote store and the board.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command.unwrap_or(cli::Command::Board) {
        cli::Command::Board => run_board(&config).await?,
        cli::Command::Version => print_version(),
        cli::Command::Signup { email } => account::signup(&email, &config).await?,
        cli::Command::Login { email } => account::login(&email, &config).await?,
        cli::Command::Logout => account::logout(&config).await?,
        cli::Command::ResetPassword { email } => account::reset_password(&email, &config).await?,
        cli::Command::Avatar { path } => account::avatar(&path, &config).await?,
        cli::Command::Task(cmd) => tasks::handle(cmd, &config).await?,
        cli::Command::Config(ConfigCommand::Init) => init_config(&config)?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info to avoid noisy stdout.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("everdo {}", env!("CARGO_PKG_VERSION"));
}

async fn run_board(config: &config::Config) -> Result<()> {
    let session = session::require_session(config)?;
    let store = Arc::new(remote::task_store(config, &session)?);
    tui::launch(store, session.uid).await
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
