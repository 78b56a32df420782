//! Command dispatch: bridges CLI args -> domain stores -> output formatting.

pub mod accounts;
pub mod auth;
pub mod budgets;
pub mod config_cmd;
pub mod sols;
pub mod transactions;
pub mod util;

use std::path::PathBuf;

use solfin_config::Config;
use solfin_core::AppContext;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// `--config` / `SOLFIN_CONFIG`, else the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(solfin_config::config_path)
}

/// Effective configuration with command-line overrides applied.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = solfin_config::load_config_from(&config_file(global))?;
    if let Some(base_url) = &global.base_url {
        cfg.api.base_url.clone_from(base_url);
    }
    Ok(cfg)
}

/// Dispatch a command that talks to the service.
pub async fn dispatch(cmd: Command, ctx: &AppContext, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => auth::login(ctx, args, global).await,
        Command::Register(args) => auth::register(ctx, args, global).await,
        Command::Logout => auth::logout(ctx).await,
        Command::Whoami => auth::whoami(ctx, global).await,
        Command::Profile(args) => auth::update_profile(ctx, args, global).await,
        Command::Accounts(args) => accounts::handle(ctx, args, global).await,
        Command::Transactions(args) => transactions::handle(ctx, args, global).await,
        Command::Budgets(args) => budgets::handle(ctx, args, global).await,
        Command::Sols(args) => sols::handle(ctx, args, global).await,
        // Handled before a context is built
        Command::Config(_) => Ok(()),
    }
}
