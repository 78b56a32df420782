use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{Account, AccountUpdate, BalanceAdjustment, NewAccount};
use crate::transport::Confirmed;

impl ApiClient {
    pub async fn list_accounts(&self) -> Result<Confirmed<Vec<Account>>, Error> {
        let confirmed: Confirmed<Vec<Account>> = self.get_json("/accounts").await?;
        debug!(count = confirmed.data.len(), "listed accounts");
        Ok(confirmed)
    }

    pub async fn get_account(&self, id: &str) -> Result<Confirmed<Account>, Error> {
        self.get_json(&format!("/accounts/{id}")).await
    }

    pub async fn create_account(&self, account: &NewAccount) -> Result<Confirmed<Account>, Error> {
        self.post_json("/accounts", account).await
    }

    pub async fn update_account(
        &self,
        id: &str,
        update: &AccountUpdate,
    ) -> Result<Confirmed<Account>, Error> {
        self.patch_json(&format!("/accounts/{id}"), update).await
    }

    /// Returns the account with its corrected balance.
    pub async fn adjust_balance(
        &self,
        id: &str,
        adjustment: &BalanceAdjustment,
    ) -> Result<Confirmed<Account>, Error> {
        self.post_json(&format!("/accounts/{id}/adjust-balance"), adjustment)
            .await
    }
}
