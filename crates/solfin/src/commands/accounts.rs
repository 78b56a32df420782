//! Account command handlers.

use tabled::Tabled;

use solfin_core::{Account, AccountUpdate, AppContext, BalanceAdjustment, NewAccount};

use crate::cli::{AccountsArgs, AccountsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Balance")]
    balance: String,
    #[tabled(rename = "Archived")]
    archived: String,
}

impl From<&Account> for AccountRow {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id.clone(),
            name: a.name.clone(),
            kind: util::wire_name(&a.kind),
            balance: util::format_amount(a.balance, &a.currency),
            archived: if a.archived { "yes".into() } else { String::new() },
        }
    }
}

fn detail(a: &Account) -> String {
    let row = AccountRow::from(a);
    [
        format!("Name:    {}", row.name),
        format!("Kind:    {}", row.kind),
        format!("Balance: {}", row.balance),
        format!("ID:      {}", row.id),
    ]
    .join("\n")
}

fn print_one(account: &Account, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(global.output, account, detail, |a| a.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    ctx: &AppContext,
    args: AccountsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let accounts = ctx.accounts();
    match args.command {
        AccountsCommand::List => {
            accounts.fetch_all().await?;
            let out = output::render_list(
                global.output,
                &accounts.all(),
                |a| AccountRow::from(a),
                |a| a.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AccountsCommand::Get { id } => {
            let account = accounts
                .fetch_one(&id)
                .await
                .map_err(|e| CliError::from(e).with_list_hint("accounts list"))?;
            print_one(&account, global)
        }

        AccountsCommand::Create {
            name,
            kind,
            currency,
            balance,
        } => {
            let account = accounts
                .create(NewAccount {
                    name,
                    kind: kind.into(),
                    currency,
                    initial_balance: util::parse_amount("balance", &balance)?,
                })
                .await?;
            print_one(&account, global)
        }

        AccountsCommand::Update {
            id,
            name,
            kind,
            archived,
        } => {
            let update = AccountUpdate {
                name,
                kind: kind.map(Into::into),
                archived,
            };
            let account = accounts
                .update(&id, update)
                .await
                .map_err(|e| CliError::from(e).with_list_hint("accounts list"))?;
            print_one(&account, global)
        }

        AccountsCommand::Adjust { id, delta, reason } => {
            let delta = util::parse_amount("delta", &delta)?;
            let account = accounts
                .adjust_balance(&id, BalanceAdjustment { delta, reason })
                .await
                .map_err(|e| CliError::from(e).with_list_hint("accounts list"))?;
            print_one(&account, global)
        }
    }
}
