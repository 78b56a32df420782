// Authentication endpoints: sign-in, sign-up, sign-out, profile.
//
// Sign-in and sign-up are the only calls made without a credential; both
// install the returned credential pair into the session store.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{debug, info};

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{ProfileUpdate, RegisterRequest, TokenResponse, User};
use crate::transport::{ApiRequest, Confirmed};

impl ApiClient {
    /// Sign in and install the session. Fetches the profile when the
    /// token response does not embed the user.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<Confirmed<User>, Error> {
        let request = ApiRequest::post(
            "/auth/login",
            json!({ "email": email, "password": password.expose_secret() }),
        );
        let confirmed = self
            .send_anonymous(&request)
            .await?
            .into_confirmed::<TokenResponse>()?;
        self.install_session(confirmed).await
    }

    /// Create an account and sign in with it.
    pub async fn register(&self, form: &RegisterRequest) -> Result<Confirmed<User>, Error> {
        let mut body = json!({
            "email": form.email,
            "password": form.password.expose_secret(),
            "first_name": form.first_name,
            "last_name": form.last_name,
        });
        if let Some(phone) = &form.phone {
            body["phone"] = json!(phone);
        }
        let confirmed = self
            .send_anonymous(&ApiRequest::post("/auth/register", body))
            .await?
            .into_confirmed::<TokenResponse>()?;
        self.install_session(confirmed).await
    }

    /// Revoke the refresh credential server-side (best effort) and clear
    /// the local session. Never fails.
    pub async fn logout(&self) -> Confirmed<()> {
        if let Some(credentials) = self.session().credentials() {
            let request = ApiRequest::post(
                "/auth/logout",
                json!({ "refresh_token": credentials.refresh_token.expose_secret() }),
            )
            .bearer(credentials.access_token.expose_secret());
            match request {
                Ok(request) => {
                    if let Err(e) = self.send_anonymous(&request).await {
                        debug!(error = %e, "server-side logout failed, clearing locally");
                    }
                }
                Err(e) => debug!(error = %e, "skipping server-side logout"),
            }
        }
        self.session().clear();
        info!("signed out");
        Confirmed::with_message((), "Signed out")
    }

    /// Fetch the current user and refresh the session's copy.
    pub async fn me(&self) -> Result<Confirmed<User>, Error> {
        let confirmed: Confirmed<User> = self.get_json("/auth/me").await?;
        self.session().set_user(confirmed.data.clone());
        Ok(confirmed)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Confirmed<User>, Error> {
        let confirmed: Confirmed<User> = self.patch_json("/auth/me", update).await?;
        self.session().set_user(confirmed.data.clone());
        Ok(confirmed)
    }

    async fn install_session(
        &self,
        confirmed: Confirmed<TokenResponse>,
    ) -> Result<Confirmed<User>, Error> {
        let Confirmed { data, message } = confirmed;
        let (credentials, user) = data.into_credentials(Utc::now())?;
        self.session().establish(credentials, user.clone());

        let user = match user {
            Some(user) => user,
            None => match self.me().await {
                Ok(profile) => profile.data,
                Err(e) => {
                    self.session().clear();
                    return Err(e);
                }
            },
        };
        info!(user = %user.id, "signed in");
        Ok(Confirmed { data: user, message })
    }
}
