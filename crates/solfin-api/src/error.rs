use std::collections::BTreeMap;

use thiserror::Error;

/// Coarse error taxonomy shared by every layer above the transport.
///
/// Stores and notifications only care about which bucket a failure falls
/// into; the full [`Error`] keeps the details for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response was received (connectivity, DNS, timeout).
    Network,
    /// The access credential expired; recoverable through a refresh.
    AuthExpired,
    /// The session is gone and the user has to sign in again.
    AuthRequired,
    /// The server rejected the request (4xx), possibly with field messages.
    Validation,
    /// The server failed (5xx).
    Server,
    /// Anything that does not fit the buckets above.
    Unknown,
}

/// Top-level error type for the `solfin-api` crate.
///
/// HTTP-level failures never surface as raw `reqwest` errors: non-2xx
/// responses are parsed into [`Validation`](Self::Validation),
/// [`Server`](Self::Server) or one of the auth variants. `solfin-core`
/// maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The access credential was rejected as expired (HTTP 401).
    #[error("Access credential expired")]
    AuthExpired,

    /// No usable session: never signed in, refresh failed, or the
    /// credential was rejected again after a refresh.
    #[error("Authentication required: {message}")]
    AuthRequired { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── API ─────────────────────────────────────────────────────────
    /// 4xx response. `fields` maps form fields to their messages.
    #[error("{message}")]
    Validation {
        status: u16,
        message: String,
        fields: BTreeMap<String, String>,
    },

    /// 5xx response.
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// Unexpected status or response shape.
    #[error("Unexpected response: {message}")]
    Unknown { status: Option<u16>, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Request body could not be encoded.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    // ── Session persistence ─────────────────────────────────────────
    #[error("Session storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Which taxonomy bucket this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthExpired => ErrorKind::AuthExpired,
            Self::AuthRequired { .. } => ErrorKind::AuthRequired,
            Self::Transport(_) | Self::Timeout { .. } => ErrorKind::Network,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Server { .. } => ErrorKind::Server,
            Self::Unknown { .. }
            | Self::InvalidUrl(_)
            | Self::Deserialization { .. }
            | Self::Serialization { .. }
            | Self::Storage(_) => ErrorKind::Unknown,
        }
    }

    /// Returns `true` if the access credential expired and a refresh
    /// might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Server { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// HTTP status code, when the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthExpired => Some(401),
            Self::Validation { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::Unknown { status, .. } => *status,
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Field-level validation messages, if any.
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Validation { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }
}
