use std::ops::Deref;
use std::sync::Arc;

use solfin_api::ApiClient;

use crate::error::CoreError;
use crate::events::LifecycleBus;
use crate::model::{NewTransaction, Transaction, TransactionReceipt, TransactionUpdate};
use crate::store::{
    DomainStore, EntityCollection, Mutation, OperationKind, RunOptions, merge_entity, temp_id,
};

pub struct TransactionStore {
    store: DomainStore<Transaction>,
    api: ApiClient,
}

impl Deref for TransactionStore {
    type Target = DomainStore<Transaction>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

fn merge_receipt(
    collection: &EntityCollection<Transaction>,
    receipt: &TransactionReceipt,
    placeholder: Option<&str>,
) {
    merge_entity(collection, &receipt.transaction, placeholder);
}

impl TransactionStore {
    pub fn new(api: ApiClient, bus: Arc<LifecycleBus>) -> Self {
        Self {
            store: DomainStore::new("transactions", bus),
            api,
        }
    }

    /// Replace the list with the server's, optionally for one account.
    pub async fn fetch_all(&self, account_id: Option<&str>) -> Result<Vec<Transaction>, CoreError> {
        self.store
            .run_list(
                OperationKind::FETCH,
                RunOptions::quiet(),
                self.api.list_transactions(account_id),
            )
            .await
    }

    /// The receipt's account, when present, is not applied here; see
    /// `AppContext::record_transaction`.
    pub async fn create(&self, transaction: NewTransaction) -> Result<TransactionReceipt, CoreError> {
        let placeholder = Transaction {
            id: temp_id(),
            account_id: transaction.account_id.clone(),
            kind: transaction.kind,
            amount: transaction.amount,
            label: transaction.label.clone(),
            category: transaction.category.clone(),
            occurred_at: transaction.occurred_at,
            budget_id: transaction.budget_id.clone(),
        };
        let options = RunOptions::new()
            .optimistic(Mutation::Insert(placeholder))
            .success_message("Transaction recorded");
        self.store
            .run(
                OperationKind::CREATE,
                options,
                self.api.create_transaction(&transaction),
                merge_receipt,
            )
            .await
    }

    pub async fn update(
        &self,
        id: &str,
        update: TransactionUpdate,
    ) -> Result<TransactionReceipt, CoreError> {
        let mut options = RunOptions::new().success_message("Transaction updated");
        if let Some(current) = self.store.get(id) {
            options = options.optimistic(Mutation::Replace(current.with_update(&update)));
        }
        self.store
            .run(
                OperationKind::UPDATE,
                options,
                self.api.update_transaction(id, &update),
                merge_receipt,
            )
            .await
    }
}
