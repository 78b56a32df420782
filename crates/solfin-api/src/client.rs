// Authenticated API client.
//
// Wraps `HttpTransport` with the session: attaches the access credential,
// and on an expired credential joins the single in-flight refresh (see
// `refresh.rs`) before replaying the request exactly once.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::Error;
use crate::refresh::RefreshTicket;
use crate::session::{CredentialPair, SessionStore};
use crate::transport::{ApiRequest, ApiResponse, Confirmed, HttpTransport, TransportConfig};

const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// Cloneable handle; all clones share the session and the refresh slot.
#[derive(Clone)]
pub struct ApiClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) transport: HttpTransport,
    pub(crate) session: Arc<SessionStore>,
    pub(crate) refresh: Mutex<Option<RefreshTicket>>,
    pub(crate) refresh_timeout: Duration,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.transport.base_url().as_str())
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(transport: HttpTransport, session: Arc<SessionStore>) -> Self {
        Self::with_refresh_timeout(transport, session, DEFAULT_REFRESH_TIMEOUT)
    }

    /// Bound how long waiters wait on one refresh before failing.
    pub fn with_refresh_timeout(
        transport: HttpTransport,
        session: Arc<SessionStore>,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                session,
                refresh: Mutex::new(None),
                refresh_timeout,
            }),
        }
    }

    pub fn from_config(config: &TransportConfig, session: Arc<SessionStore>) -> Result<Self, Error> {
        Ok(Self::new(HttpTransport::new(config)?, session))
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    pub fn transport(&self) -> &HttpTransport {
        &self.inner.transport
    }

    /// Send with the current access credential.
    ///
    /// - no session: [`Error::AuthRequired`] without touching the network
    /// - expired credential (locally or per the server): one shared
    ///   refresh, then a single replay
    /// - rejected again after the refresh: the session is cleared
    pub async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, Error> {
        let state = self.inner.session.snapshot();
        let Some(session) = state.session.as_ref() else {
            return Err(Error::AuthRequired {
                message: "not signed in".into(),
            });
        };
        let observed = state.generation;

        if session.credentials.is_access_expired(Utc::now()) {
            debug!(path = %request.path, "access credential expired locally, refreshing first");
            self.await_refresh(observed).await?;
            return self.replay(request).await;
        }

        match self.attempt(request, &session.credentials).await {
            Err(e) if e.is_auth_expired() => {
                debug!(path = %request.path, "access credential rejected, joining refresh");
                self.await_refresh(observed).await?;
                self.replay(request).await
            }
            Err(e @ Error::AuthRequired { .. }) => {
                warn!(path = %request.path, error = %e, "session rejected by server");
                self.inner.session.clear();
                Err(e)
            }
            other => other,
        }
    }

    /// Send without credentials (sign-in, registration).
    pub async fn send_anonymous(&self, request: &ApiRequest) -> Result<ApiResponse, Error> {
        self.inner.transport.send(request).await
    }

    async fn attempt(
        &self,
        request: &ApiRequest,
        credentials: &CredentialPair,
    ) -> Result<ApiResponse, Error> {
        let authed = request
            .clone()
            .bearer(credentials.access_token.expose_secret())?;
        self.inner.transport.send(&authed).await
    }

    async fn replay(&self, request: &ApiRequest) -> Result<ApiResponse, Error> {
        let Some(credentials) = self.inner.session.credentials() else {
            return Err(Error::AuthRequired {
                message: "session ended while refreshing".into(),
            });
        };
        match self.attempt(request, &credentials).await {
            Err(e) if e.is_auth_expired() => {
                warn!(path = %request.path, "credential rejected after refresh, clearing session");
                self.inner.session.clear();
                Err(Error::AuthRequired {
                    message: "session expired, sign in again".into(),
                })
            }
            Err(e @ Error::AuthRequired { .. }) => {
                self.inner.session.clear();
                Err(e)
            }
            other => other,
        }
    }

    // ── JSON helpers ─────────────────────────────────────────────────

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Confirmed<T>, Error> {
        self.send(&ApiRequest::get(path)).await?.into_confirmed()
    }

    pub(crate) async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Confirmed<T>, Error> {
        let request = query
            .iter()
            .fold(ApiRequest::get(path), |req, (k, v)| req.query(*k, *v));
        self.send(&request).await?.into_confirmed()
    }

    pub(crate) async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Confirmed<T>, Error> {
        self.send(&ApiRequest::post(path, to_body(body)?))
            .await?
            .into_confirmed()
    }

    pub(crate) async fn patch_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Confirmed<T>, Error> {
        self.send(&ApiRequest::patch(path, to_body(body)?))
            .await?
            .into_confirmed()
    }
}

pub(crate) fn to_body<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value, Error> {
    serde_json::to_value(body).map_err(|e| Error::Serialization {
        message: e.to_string(),
    })
}
