//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use std::collections::BTreeMap;

use miette::Diagnostic;
use thiserror::Error;

use solfin_config::ConfigError;
use solfin_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REJECTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the solfin service")]
    #[diagnostic(
        code(solfin::connection_failed),
        help(
            "{reason}\n\
             Check your connection and the api.base_url setting (solfin config show)."
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Request timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(solfin::timeout),
        help("Raise api.timeout_secs in the config file or try again later.")
    )]
    Timeout { timeout_ms: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Not signed in: {message}")]
    #[diagnostic(code(solfin::auth_required), help("Run: solfin login --email <EMAIL>"))]
    AuthRequired { message: String },

    #[error("No password given")]
    #[diagnostic(
        code(solfin::no_password),
        help("Set {env} or run the command from an interactive terminal.")
    )]
    NoPassword { env: String },

    // ── Server responses ─────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(solfin::rejected))]
    Rejected {
        message: String,
        #[help]
        fields: Option<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(solfin::not_found), help("Run: solfin {list_command}"))]
    NotFound {
        message: String,
        list_command: String,
    },

    #[error("The service failed (HTTP {status}): {message}")]
    #[diagnostic(code(solfin::server))]
    Server { status: u16, message: String },

    #[error("{message}")]
    #[diagnostic(code(solfin::unknown))]
    Unknown { message: String },

    // ── Input ────────────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(solfin::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(solfin::config),
        help("Inspect the effective settings with: solfin config show")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render output: {0}")]
    #[diagnostic(code(solfin::json))]
    Json(#[from] serde_json::Error),

    #[error("Could not render config: {0}")]
    #[diagnostic(code(solfin::toml))]
    Toml(#[from] toml::ser::Error),
}

/// One `field: message` line per rejected field.
fn field_help(fields: &BTreeMap<String, String>) -> Option<String> {
    (!fields.is_empty()).then(|| {
        fields
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("\n")
    })
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthRequired { .. } | Self::NoPassword { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Validation { .. } | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the list command that would show the missing entity.
    pub fn with_list_hint(self, list_command: &str) -> Self {
        match self {
            Self::NotFound { message, .. } => Self::NotFound {
                message,
                list_command: list_command.into(),
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Network { reason } => CliError::ConnectionFailed { reason },
            CoreError::Timeout { timeout_ms } => CliError::Timeout { timeout_ms },
            CoreError::AuthRequired { message } => CliError::AuthRequired { message },
            CoreError::Validation { message, fields } => CliError::Rejected {
                message,
                fields: field_help(&fields),
            },
            CoreError::NotFound { message } => CliError::NotFound {
                message,
                list_command: "--help".into(),
            },
            CoreError::Server { status, message } => CliError::Server { status, message },
            CoreError::Unknown { message } => CliError::Unknown { message },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_fields_become_help_lines() {
        let err = CliError::from(CoreError::Validation {
            message: "Invalid input".into(),
            fields: BTreeMap::from([
                ("amount".to_owned(), "must be positive".to_owned()),
                ("label".to_owned(), "required".to_owned()),
            ]),
        });
        let CliError::Rejected { fields, .. } = err else {
            panic!("expected Rejected");
        };
        assert_eq!(
            fields.as_deref(),
            Some("amount: must be positive\nlabel: required")
        );
    }

    #[test]
    fn auth_errors_exit_with_auth_code() {
        let err = CliError::from(CoreError::AuthRequired {
            message: "signed out".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn not_found_takes_list_hint() {
        let err = CliError::from(CoreError::NotFound {
            message: "no such account".into(),
        })
        .with_list_hint("accounts list");
        assert!(matches!(
            err,
            CliError::NotFound { ref list_command, .. } if list_command == "accounts list"
        ));
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }
}
