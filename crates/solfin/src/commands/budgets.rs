//! Budget command handlers.

use tabled::Tabled;

use solfin_core::{AppContext, Budget, BudgetUpdate, NewBudget};

use crate::cli::{BudgetsArgs, BudgetsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct BudgetRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Period")]
    period: String,
    #[tabled(rename = "Spent")]
    spent: String,
    #[tabled(rename = "Limit")]
    limit: String,
    #[tabled(rename = "Left")]
    left: String,
}

fn amount(minor: i64) -> String {
    util::format_amount(minor, "").trim_end().to_owned()
}

impl From<&Budget> for BudgetRow {
    fn from(b: &Budget) -> Self {
        Self {
            id: b.id.clone(),
            name: b.name.clone(),
            category: b.category.clone(),
            period: util::wire_name(&b.period),
            spent: amount(b.spent),
            limit: amount(b.limit),
            left: amount(b.remaining()),
        }
    }
}

fn detail(b: &Budget) -> String {
    let row = BudgetRow::from(b);
    [
        format!("{} ({}, {})", row.name, row.category, row.period),
        format!("Spent: {} of {}", row.spent, row.limit),
        format!("Left:  {}", row.left),
        format!("ID:    {}", row.id),
    ]
    .join("\n")
}

fn print_one(budget: &Budget, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(global.output, budget, detail, |b| b.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle(
    ctx: &AppContext,
    args: BudgetsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let budgets = ctx.budgets();
    match args.command {
        BudgetsCommand::List => {
            budgets.fetch_all().await?;
            let out = output::render_list(
                global.output,
                &budgets.all(),
                |b| BudgetRow::from(b),
                |b| b.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BudgetsCommand::Create {
            name,
            category,
            limit,
            period,
        } => {
            let budget = budgets
                .create(NewBudget {
                    name,
                    category,
                    limit: util::parse_positive_amount("limit", &limit)?,
                    period: period.into(),
                    starts_on: None,
                })
                .await?;
            print_one(&budget, global)
        }

        BudgetsCommand::Update {
            id,
            name,
            limit,
            period,
        } => {
            let update = BudgetUpdate {
                name,
                limit: limit
                    .as_deref()
                    .map(|raw| util::parse_positive_amount("limit", raw))
                    .transpose()?,
                period: period.map(Into::into),
            };
            let budget = budgets
                .update(&id, update)
                .await
                .map_err(|e| CliError::from(e).with_list_hint("budgets list"))?;
            print_one(&budget, global)
        }
    }
}
