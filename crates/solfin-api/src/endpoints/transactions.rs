use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{NewTransaction, Transaction, TransactionReceipt, TransactionUpdate};
use crate::transport::Confirmed;

impl ApiClient {
    /// List transactions, optionally restricted to one account.
    pub async fn list_transactions(
        &self,
        account_id: Option<&str>,
    ) -> Result<Confirmed<Vec<Transaction>>, Error> {
        let confirmed: Confirmed<Vec<Transaction>> = match account_id {
            Some(account_id) => {
                self.get_json_with_query("/transactions", &[("account_id", account_id)])
                    .await?
            }
            None => self.get_json("/transactions").await?,
        };
        debug!(count = confirmed.data.len(), ?account_id, "listed transactions");
        Ok(confirmed)
    }

    /// The receipt carries the updated account when the balance moved.
    pub async fn create_transaction(
        &self,
        transaction: &NewTransaction,
    ) -> Result<Confirmed<TransactionReceipt>, Error> {
        self.post_json("/transactions", transaction).await
    }

    pub async fn update_transaction(
        &self,
        id: &str,
        update: &TransactionUpdate,
    ) -> Result<Confirmed<TransactionReceipt>, Error> {
        self.patch_json(&format!("/transactions/{id}"), update).await
    }
}
