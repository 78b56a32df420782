//! Transaction command handlers.

use tabled::Tabled;

use solfin_core::{AppContext, NewTransaction, Transaction, TransactionReceipt, TransactionUpdate};

use crate::cli::{GlobalOpts, TransactionsArgs, TransactionsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct TransactionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Account")]
    account: String,
}

impl From<&Transaction> for TransactionRow {
    fn from(t: &Transaction) -> Self {
        Self {
            id: t.id.clone(),
            date: t.occurred_at.format("%Y-%m-%d").to_string(),
            kind: util::wire_name(&t.kind),
            amount: util::format_amount(t.amount, "").trim_end().to_owned(),
            label: t.label.clone(),
            category: t.category.clone().unwrap_or_default(),
            account: t.account_id.clone(),
        }
    }
}

fn receipt_detail(receipt: &Transaction, balance: Option<String>) -> String {
    let row = TransactionRow::from(receipt);
    let mut lines = vec![
        format!("{} {} on {}", row.kind, row.amount, row.date),
        format!("Label:   {}", row.label),
        format!("Account: {}", row.account),
    ];
    if let Some(balance) = balance {
        lines.push(format!("Balance: {balance}"));
    }
    lines.push(format!("ID:      {}", row.id));
    lines.join("\n")
}

fn print_receipt(receipt: &TransactionReceipt, global: &GlobalOpts) -> Result<(), CliError> {
    let balance = receipt
        .account
        .as_ref()
        .map(|a| util::format_amount(a.balance, &a.currency));
    let out = output::render_single(
        global.output,
        &receipt.transaction,
        |t| receipt_detail(t, balance.clone()),
        |t| t.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle(
    ctx: &AppContext,
    args: TransactionsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        TransactionsCommand::List { account } => {
            let transactions = ctx.transactions();
            transactions.fetch_all(account.as_deref()).await?;
            let out = output::render_list(
                global.output,
                &transactions.all(),
                |t| TransactionRow::from(t),
                |t| t.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TransactionsCommand::Create {
            account,
            kind,
            amount,
            label,
            category,
            budget,
            at,
        } => {
            let transaction = NewTransaction {
                account_id: account,
                kind: kind.into(),
                amount: util::parse_positive_amount("amount", &amount)?,
                label,
                category,
                occurred_at: util::parse_timestamp(at.as_deref())?,
                budget_id: budget,
            };
            let receipt = ctx.record_transaction(transaction).await?;
            print_receipt(&receipt, global)
        }

        TransactionsCommand::Update {
            id,
            amount,
            label,
            category,
        } => {
            let update = TransactionUpdate {
                amount: amount
                    .as_deref()
                    .map(|raw| util::parse_positive_amount("amount", raw))
                    .transpose()?,
                label,
                category,
                occurred_at: None,
            };
            let receipt = ctx
                .update_transaction(&id, update)
                .await
                .map_err(|e| CliError::from(e).with_list_hint("transactions list"))?;
            print_receipt(&receipt, global)
        }
    }
}
