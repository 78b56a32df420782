//! Clap derive structures for the `solfin` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use solfin_core::{AccountKind, BudgetPeriod, SolFrequency, TransactionKind};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// solfin -- accounts, budgets and sols from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "solfin",
    version,
    about = "Track accounts, transactions, budgets and sols from the command line",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "SOLFIN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// API base URL (overrides the config file)
    #[arg(long, env = "SOLFIN_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one id per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session
    Login(LoginArgs),

    /// Create an account on the service and sign in
    Register(RegisterArgs),

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Update your profile
    Profile(ProfileArgs),

    /// Manage accounts
    #[command(alias = "acc")]
    Accounts(AccountsArgs),

    /// Record and list transactions
    #[command(alias = "tx")]
    Transactions(TransactionsArgs),

    /// Manage budgets
    Budgets(BudgetsArgs),

    /// Manage sols (rotating savings groups)
    Sols(SolsArgs),

    /// Inspect the effective configuration
    Config(ConfigArgs),
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    #[arg(long, short = 'e', env = "SOLFIN_EMAIL")]
    pub email: String,

    /// Read the password from this variable instead of prompting
    #[arg(long, default_value = "SOLFIN_PASSWORD", hide_default_value = true)]
    pub password_env: String,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[arg(long, short = 'e')]
    pub email: String,

    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    #[arg(long)]
    pub phone: Option<String>,

    #[arg(long, default_value = "SOLFIN_PASSWORD", hide_default_value = true)]
    pub password_env: String,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    /// Preferred currency (ISO code)
    #[arg(long)]
    pub currency: Option<String>,
}

// ── Accounts ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AccountsArgs {
    #[command(subcommand)]
    pub command: AccountsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AccountsCommand {
    /// List accounts
    #[command(alias = "ls")]
    List,

    /// Show one account
    Get { id: String },

    /// Open an account
    Create {
        #[arg(long)]
        name: String,

        #[arg(long, default_value = "checking")]
        kind: AccountKindArg,

        #[arg(long, default_value = "HTG")]
        currency: String,

        /// Opening balance, e.g. 1500 or 1500.75
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        balance: String,
    },

    /// Rename, re-type or archive an account
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        kind: Option<AccountKindArg>,

        #[arg(long)]
        archived: Option<bool>,
    },

    /// Correct a balance by a signed amount
    Adjust {
        id: String,

        /// Signed amount, e.g. -250 or 99.50
        #[arg(long, allow_hyphen_values = true)]
        delta: String,

        #[arg(long)]
        reason: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AccountKindArg {
    Checking,
    Savings,
    Cash,
    MobileMoney,
    Other,
}

impl From<AccountKindArg> for AccountKind {
    fn from(arg: AccountKindArg) -> Self {
        match arg {
            AccountKindArg::Checking => Self::Checking,
            AccountKindArg::Savings => Self::Savings,
            AccountKindArg::Cash => Self::Cash,
            AccountKindArg::MobileMoney => Self::MobileMoney,
            AccountKindArg::Other => Self::Other,
        }
    }
}

// ── Transactions ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TransactionsArgs {
    #[command(subcommand)]
    pub command: TransactionsCommand,
}

#[derive(Debug, Subcommand)]
pub enum TransactionsCommand {
    /// List transactions
    #[command(alias = "ls")]
    List {
        /// Only this account's transactions
        #[arg(long)]
        account: Option<String>,
    },

    /// Record a transaction
    #[command(alias = "add")]
    Create {
        #[arg(long)]
        account: String,

        #[arg(long, default_value = "expense")]
        kind: TransactionKindArg,

        /// Amount, e.g. 250 or 12.50
        #[arg(long)]
        amount: String,

        #[arg(long)]
        label: String,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        budget: Option<String>,

        /// RFC 3339 timestamp; defaults to now
        #[arg(long)]
        at: Option<String>,
    },

    /// Edit a transaction
    Update {
        id: String,

        #[arg(long)]
        amount: Option<String>,

        #[arg(long)]
        label: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TransactionKindArg {
    Income,
    Expense,
    Transfer,
}

impl From<TransactionKindArg> for TransactionKind {
    fn from(arg: TransactionKindArg) -> Self {
        match arg {
            TransactionKindArg::Income => Self::Income,
            TransactionKindArg::Expense => Self::Expense,
            TransactionKindArg::Transfer => Self::Transfer,
        }
    }
}

// ── Budgets ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BudgetsArgs {
    #[command(subcommand)]
    pub command: BudgetsCommand,
}

#[derive(Debug, Subcommand)]
pub enum BudgetsCommand {
    /// List budgets
    #[command(alias = "ls")]
    List,

    /// Create a budget
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        category: String,

        /// Spending limit, e.g. 5000
        #[arg(long)]
        limit: String,

        #[arg(long, default_value = "monthly")]
        period: PeriodArg,
    },

    /// Edit a budget
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        limit: Option<String>,

        #[arg(long)]
        period: Option<PeriodArg>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PeriodArg {
    Weekly,
    Monthly,
    Yearly,
}

impl From<PeriodArg> for BudgetPeriod {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Weekly => Self::Weekly,
            PeriodArg::Monthly => Self::Monthly,
            PeriodArg::Yearly => Self::Yearly,
        }
    }
}

// ── Sols ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SolsArgs {
    #[command(subcommand)]
    pub command: SolsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SolsCommand {
    /// List sols you belong to
    #[command(alias = "ls")]
    List,

    /// Show one sol and its members
    Get { id: String },

    /// Start a sol
    Create {
        #[arg(long)]
        name: String,

        /// Per-round contribution
        #[arg(long)]
        contribution: String,

        #[arg(long, default_value = "HTG")]
        currency: String,

        #[arg(long, default_value = "monthly")]
        frequency: FrequencyArg,
    },

    /// Edit a sol you manage
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        contribution: Option<String>,

        #[arg(long)]
        frequency: Option<FrequencyArg>,
    },

    /// Join a sol
    Join { id: String },

    /// Pay this round's contribution
    Contribute {
        id: String,

        #[arg(long)]
        amount: String,

        /// Account the money leaves from
        #[arg(long)]
        account: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FrequencyArg {
    Weekly,
    Monthly,
}

impl From<FrequencyArg> for SolFrequency {
    fn from(arg: FrequencyArg) -> Self {
        match arg {
            FrequencyArg::Weekly => Self::Weekly,
            FrequencyArg::Monthly => Self::Monthly,
        }
    }
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Print the effective configuration as TOML
    Show,
}
