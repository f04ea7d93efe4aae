//! alertwatch - evaluates entity change events against alert subscriptions.

use alertwatch::{app, cli::Cli, cli::Command, config::Config};
use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli)?;

    // RUST_LOG wins over the configured level. Logs go to stderr; stdout
    // carries command output.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.core.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    debug!(?config, "Configuration loaded");

    let command = cli.command.clone().unwrap_or(Command::Validate);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    app::run(command, &config, &mut out)
}
