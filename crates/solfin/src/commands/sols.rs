//! Sol (rotating savings group) command handlers.

use tabled::Tabled;

use solfin_core::{AppContext, Contribution, CoreError, NewSol, Sol, SolUpdate};

use crate::cli::{GlobalOpts, SolsArgs, SolsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct SolRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Round")]
    round: String,
    #[tabled(rename = "Contribution")]
    contribution: String,
    #[tabled(rename = "Pot")]
    pot: String,
}

impl From<&Sol> for SolRow {
    fn from(s: &Sol) -> Self {
        Self {
            id: s.id.clone(),
            name: s.name.clone(),
            status: util::wire_name(&s.status),
            round: format!("{}/{}", s.current_round, s.members.len()),
            contribution: format!(
                "{} {}",
                util::format_amount(s.contribution, &s.currency),
                util::wire_name(&s.frequency)
            ),
            pot: util::format_amount(s.pot(), &s.currency),
        }
    }
}

fn detail(s: &Sol) -> String {
    let row = SolRow::from(s);
    let mut lines = vec![
        format!("{} ({})", row.name, row.status),
        format!("Contribution: {}", row.contribution),
        format!("Pot:          {}", row.pot),
        format!("Round:        {}", row.round),
        format!("ID:           {}", row.id),
    ];
    if !s.members.is_empty() {
        lines.push("Members:".into());
        let mut members: Vec<_> = s.members.iter().collect();
        members.sort_by_key(|m| m.position);
        for m in members {
            let mark = if m.has_received { " (paid out)" } else { "" };
            let name = if m.display_name.is_empty() {
                &m.user_id
            } else {
                &m.display_name
            };
            lines.push(format!("  {}. {name}{mark}", m.position));
        }
    }
    lines.join("\n")
}

fn print_one(sol: &Sol, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(global.output, sol, detail, |s| s.id.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle(ctx: &AppContext, args: SolsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let sols = ctx.sols();
    let hint = |e: CoreError| CliError::from(e).with_list_hint("sols list");
    match args.command {
        SolsCommand::List => {
            sols.fetch_all().await?;
            let out = output::render_list(
                global.output,
                &sols.all(),
                |s| SolRow::from(s),
                |s| s.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SolsCommand::Get { id } => {
            let sol = sols.fetch_one(&id).await.map_err(hint)?;
            print_one(&sol, global)
        }

        SolsCommand::Create {
            name,
            contribution,
            currency,
            frequency,
        } => {
            let sol = sols
                .create(NewSol {
                    name,
                    contribution: util::parse_positive_amount("contribution", &contribution)?,
                    currency,
                    frequency: frequency.into(),
                })
                .await?;
            print_one(&sol, global)
        }

        SolsCommand::Update {
            id,
            name,
            contribution,
            frequency,
        } => {
            let update = SolUpdate {
                name,
                contribution: contribution
                    .as_deref()
                    .map(|raw| util::parse_positive_amount("contribution", raw))
                    .transpose()?,
                frequency: frequency.map(Into::into),
            };
            let sol = sols.update(&id, update).await.map_err(hint)?;
            print_one(&sol, global)
        }

        SolsCommand::Join { id } => {
            let sol = sols.join(&id).await.map_err(hint)?;
            print_one(&sol, global)
        }

        SolsCommand::Contribute {
            id,
            amount,
            account,
        } => {
            let contribution = Contribution {
                amount: util::parse_positive_amount("amount", &amount)?,
                account_id: account,
            };
            let sol = sols.contribute(&id, contribution).await.map_err(hint)?;
            print_one(&sol, global)
        }
    }
}
