//! Output formatting: table, JSON, plain, plus the notification trailer.
//!
//! Command results go to stdout in the format selected by `--output`;
//! notifications raised by the operation go to stderr.

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use solfin_core::{Notification, NotificationKind, NotificationQueue};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[Arc<T>],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(|item| to_row(item.as_ref())).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => data
            .iter()
            .map(|item| id_fn(item.as_ref()))
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

/// Single-item detail; table mode uses `detail_fn` instead of a row.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    Ok(match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => id_fn(data),
    })
}

pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Notifications ────────────────────────────────────────────────────

fn badge(kind: NotificationKind, color: bool) -> String {
    let label = match kind {
        NotificationKind::Success => "✓",
        NotificationKind::Error => "✗",
        NotificationKind::Warning => "!",
        NotificationKind::Info => "i",
    };
    if !color {
        return label.to_owned();
    }
    match kind {
        NotificationKind::Success => label.green().bold().to_string(),
        NotificationKind::Error => label.red().bold().to_string(),
        NotificationKind::Warning => label.yellow().bold().to_string(),
        NotificationKind::Info => label.cyan().bold().to_string(),
    }
}

pub fn format_notification(notification: &Notification, color: bool) -> String {
    let badge = badge(notification.kind, color);
    match &notification.title {
        Some(title) if color => format!("{badge} {}: {}", title.bold(), notification.message),
        Some(title) => format!("{badge} {title}: {}", notification.message),
        None => format!("{badge} {}", notification.message),
    }
}

/// Print whatever the queue still shows, oldest first, then clear it.
/// Errors are printed even in quiet mode.
pub fn flush_notifications(queue: &NotificationQueue, quiet: bool, color: bool) {
    let mut stderr = io::stderr().lock();
    for notification in queue.visible() {
        if quiet && notification.kind != NotificationKind::Error {
            continue;
        }
        let _ = writeln!(stderr, "{}", format_notification(&notification, color));
    }
    queue.clear();
}
