// Single-flight credential refresh.
//
// At most one refresh runs per client. Callers that see an expired
// credential register a waiter on the current ticket (creating it and
// spawning the refresh if none exists) and are all released with the
// same outcome. The refresh runs on its own task so a cancelled caller
// never strands the others.
//
// The session generation is bumped before the ticket is released, and
// the generation check happens under the ticket lock: a caller that
// observed an older generation either joins the running ticket or sees
// the new generation and replays immediately.

use std::sync::PoisonError;

use chrono::Utc;
use secrecy::ExposeSecret;
use serde_json::json;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::TokenResponse;
use crate::transport::ApiRequest;

pub(crate) const REFRESH_PATH: &str = "/auth/refresh";

type Outcome = Result<(), String>;

/// The in-flight refresh and everyone waiting on it.
pub(crate) struct RefreshTicket {
    waiters: Vec<oneshot::Sender<Outcome>>,
    started_at: Instant,
}

impl ApiClient {
    /// `true` while a refresh is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.inner
            .refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Wait until the credentials are newer than `observed`, starting a
    /// refresh if none is running.
    pub(crate) async fn await_refresh(&self, observed: u64) -> Result<(), Error> {
        let rx = {
            let mut slot = self
                .inner
                .refresh
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if self.inner.session.generation() != observed {
                return Ok(());
            }

            let (tx, rx) = oneshot::channel();
            if let Some(ticket) = slot.as_mut() {
                ticket.waiters.push(tx);
                debug!(waiters = ticket.waiters.len(), "joined in-flight refresh");
            } else {
                *slot = Some(RefreshTicket {
                    waiters: vec![tx],
                    started_at: Instant::now(),
                });
                let client = self.clone();
                tokio::spawn(async move { client.run_refresh().await });
            }
            rx
        };

        match rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(Error::AuthRequired { message }),
            Err(_) => Err(Error::AuthRequired {
                message: "credential refresh was abandoned".into(),
            }),
        }
    }

    async fn run_refresh(self) {
        let mut release = TicketRelease {
            client: &self,
            outcome: None,
        };
        release.outcome = Some(match self.refresh_credentials().await {
            Ok(generation) => {
                info!(generation, "credentials refreshed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "credential refresh failed, clearing session");
                self.inner.session.clear();
                Err(format!("session expired, sign in again ({e})"))
            }
        });
    }

    fn release_waiters(&self, outcome: &Outcome) {
        let ticket = self
            .inner
            .refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(ticket) = ticket {
            debug!(
                waiters = ticket.waiters.len(),
                elapsed_ms = u64::try_from(ticket.started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
                "releasing refresh waiters"
            );
            for waiter in ticket.waiters {
                // A waiter whose caller was dropped is fine to skip.
                let _ = waiter.send(outcome.clone());
            }
        }
    }

    async fn refresh_credentials(&self) -> Result<u64, Error> {
        let Some(credentials) = self.inner.session.credentials() else {
            return Err(Error::AuthRequired {
                message: "no session to refresh".into(),
            });
        };
        if !credentials.has_refresh_token() {
            return Err(Error::AuthRequired {
                message: "no refresh credential".into(),
            });
        }

        let request = ApiRequest::post(
            REFRESH_PATH,
            json!({ "refresh_token": credentials.refresh_token.expose_secret() }),
        );
        let timeout = self.inner.refresh_timeout;
        let response = tokio::time::timeout(timeout, self.inner.transport.send(&request))
            .await
            .map_err(|_| Error::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })??;

        let tokens: TokenResponse = response.into_confirmed()?.data;
        let (pair, user) = tokens.into_credentials(Utc::now())?;
        Ok(self.inner.session.establish(pair, user))
    }
}

/// Releases the ticket when the refresh task ends, however it ends.
///
/// Without an outcome the task was torn down mid-refresh: the session is
/// cleared and every waiter is rejected.
struct TicketRelease<'a> {
    client: &'a ApiClient,
    outcome: Option<Outcome>,
}

impl Drop for TicketRelease<'_> {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or_else(|| {
            warn!("credential refresh ended without an outcome, clearing session");
            self.client.inner.session.clear();
            Err("session expired, sign in again (credential refresh was interrupted)".into())
        });
        self.client.release_waiters(&outcome);
    }
}
