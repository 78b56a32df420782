// ── Core error types ──
//
// User-facing errors from solfin-core. Consumers never see raw HTTP
// details; the `From<solfin_api::Error>` impl folds transport-layer
// errors into the taxonomy stores and notifications work with.

use std::collections::BTreeMap;

use solfin_api::ErrorKind;
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connectivity ─────────────────────────────────────────────────
    #[error("Cannot reach the solfin service: {reason}")]
    Network { reason: String },

    #[error("The request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── Session ──────────────────────────────────────────────────────
    #[error("Please sign in again: {message}")]
    AuthRequired { message: String },

    // ── Server responses ─────────────────────────────────────────────
    #[error("{message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, String>,
    },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("The service failed (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected error: {message}")]
    Unknown { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => ErrorKind::Network,
            Self::AuthRequired { .. } => ErrorKind::AuthRequired,
            Self::Validation { .. } | Self::NotFound { .. } => ErrorKind::Validation,
            Self::Server { .. } => ErrorKind::Server,
            Self::Unknown { .. } | Self::Config { .. } => ErrorKind::Unknown,
        }
    }

    /// Text shown in the error notification for a failed operation.
    ///
    /// Network, server, validation and unknown errors carry their own
    /// text through unchanged; generic wording fills in only when it is
    /// blank.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { reason } => {
                or_generic(reason, "Network unavailable. Check your connection.")
            }
            Self::Timeout { .. } => "The server took too long to respond.".into(),
            Self::AuthRequired { .. } => "Your session has expired. Please sign in again.".into(),
            Self::Server { message, .. } => {
                or_generic(message, "Something went wrong on our side. Try again later.")
            }
            Self::Validation { message, .. }
            | Self::NotFound { message }
            | Self::Unknown { message }
            | Self::Config { message } => or_generic(message, "Something went wrong."),
        }
    }

    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Validation { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }

    pub fn is_auth_required(&self) -> bool {
        matches!(self, Self::AuthRequired { .. })
    }
}

fn or_generic(message: &str, generic: &str) -> String {
    if message.trim().is_empty() {
        generic.to_owned()
    } else {
        message.to_owned()
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<solfin_api::Error> for CoreError {
    fn from(err: solfin_api::Error) -> Self {
        match err {
            // A leaked expiry means the refresh path was bypassed; the
            // caller can only recover by signing in.
            solfin_api::Error::AuthExpired => CoreError::AuthRequired {
                message: "session expired".into(),
            },
            solfin_api::Error::AuthRequired { message } => CoreError::AuthRequired { message },
            solfin_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_ms: 0 }
                } else {
                    CoreError::Network {
                        reason: e.to_string(),
                    }
                }
            }
            solfin_api::Error::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            solfin_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            solfin_api::Error::Validation {
                status: 404,
                message,
                ..
            } => CoreError::NotFound { message },
            solfin_api::Error::Validation {
                message, fields, ..
            } => CoreError::Validation { message, fields },
            solfin_api::Error::Server { status, message } => CoreError::Server { status, message },
            solfin_api::Error::Unknown { message, .. }
            | solfin_api::Error::Deserialization { message, .. }
            | solfin_api::Error::Serialization { message }
            | solfin_api::Error::Storage(message) => CoreError::Unknown { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaked_expiry_requires_sign_in() {
        let err = CoreError::from(solfin_api::Error::AuthExpired);
        assert!(err.is_auth_required());
        assert_eq!(err.kind(), ErrorKind::AuthRequired);
    }

    #[test]
    fn not_found_is_split_from_validation() {
        let err = CoreError::from(solfin_api::Error::Validation {
            status: 404,
            message: "Account not found".into(),
            fields: BTreeMap::new(),
        });
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert_eq!(err.user_message(), "Account not found");
    }

    #[test]
    fn server_errors_reach_users_verbatim() {
        let err = CoreError::from(solfin_api::Error::Server {
            status: 503,
            message: "Maintenance until 14:00".into(),
        });
        assert_eq!(err.user_message(), "Maintenance until 14:00");
    }

    #[test]
    fn blank_messages_fall_back_to_generic_text() {
        let server = CoreError::Server {
            status: 500,
            message: "  ".into(),
        };
        assert_eq!(
            server.user_message(),
            "Something went wrong on our side. Try again later."
        );
        let network = CoreError::Network {
            reason: String::new(),
        };
        assert_eq!(
            network.user_message(),
            "Network unavailable. Check your connection."
        );
        let network = CoreError::Network {
            reason: "connection refused".into(),
        };
        assert_eq!(network.user_message(), "connection refused");
    }
}
