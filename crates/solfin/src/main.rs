mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use solfin_core::AppContext;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let cfg = commands::load_config(&cli.global)?;

    if let Command::Config(args) = &cli.command {
        return commands::config_cmd::handle(args, &cfg, &cli.global);
    }

    let ctx = AppContext::new(cfg.to_client_config()?, cfg.session_storage()?)?;
    ctx.start();

    tracing::debug!(command = ?cli.command, "dispatching command");
    let result = commands::dispatch(cli.command, &ctx, &cli.global).await;

    // A failure is reported once, by the error report.
    if result.is_ok() {
        output::flush_notifications(
            ctx.notifications(),
            cli.global.quiet,
            output::should_color(cli.global.color),
        );
    }
    ctx.shutdown();
    result
}
