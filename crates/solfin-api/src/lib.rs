//! Async client for the solfin personal-finance API.
//!
//! - [`transport`]: one HTTP request in, one classified response or
//!   [`Error`] out.
//! - [`session`]: the credential pair and user, with pluggable
//!   persistence.
//! - [`ApiClient`]: attaches credentials and coordinates a single
//!   in-flight refresh shared by every caller that hits an expired
//!   credential.
//! - [`models`]: wire types for accounts, transactions, budgets and sols.

pub mod client;
mod endpoints;
pub mod error;
pub mod models;
mod refresh;
pub mod session;
pub mod transport;

pub use client::ApiClient;
pub use error::{Error, ErrorKind};
pub use session::{
    CredentialPair, FileStorage, MemoryStorage, PersistedSession, SESSION_NAMESPACE, Session,
    SessionState, SessionStorage, SessionStore,
};
pub use transport::{ApiRequest, ApiResponse, Confirmed, HttpTransport, TransportConfig};
