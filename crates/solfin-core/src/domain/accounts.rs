use std::ops::Deref;
use std::sync::Arc;

use solfin_api::ApiClient;

use crate::error::CoreError;
use crate::events::LifecycleBus;
use crate::model::{Account, AccountUpdate, BalanceAdjustment, NewAccount};
use crate::store::{DomainStore, Mutation, OperationKind, RunOptions, temp_id};

pub struct AccountStore {
    store: DomainStore<Account>,
    api: ApiClient,
}

impl Deref for AccountStore {
    type Target = DomainStore<Account>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl AccountStore {
    pub fn new(api: ApiClient, bus: Arc<LifecycleBus>) -> Self {
        Self {
            store: DomainStore::new("accounts", bus),
            api,
        }
    }

    pub async fn fetch_all(&self) -> Result<Vec<Account>, CoreError> {
        self.store
            .run_list(OperationKind::FETCH, RunOptions::quiet(), self.api.list_accounts())
            .await
    }

    pub async fn fetch_one(&self, id: &str) -> Result<Account, CoreError> {
        self.store
            .run_entity(OperationKind::FETCH_ONE, RunOptions::quiet(), self.api.get_account(id))
            .await
    }

    /// Shows the account immediately under a placeholder id.
    pub async fn create(&self, account: NewAccount) -> Result<Account, CoreError> {
        let placeholder = Account {
            id: temp_id(),
            name: account.name.clone(),
            kind: account.kind,
            currency: account.currency.clone(),
            balance: account.initial_balance,
            archived: false,
            updated_at: None,
        };
        let options = RunOptions::new()
            .optimistic(Mutation::Insert(placeholder))
            .success_message("Account created");
        self.store
            .run_entity(OperationKind::CREATE, options, self.api.create_account(&account))
            .await
    }

    pub async fn update(&self, id: &str, update: AccountUpdate) -> Result<Account, CoreError> {
        let mut options = RunOptions::new().success_message("Account updated");
        if let Some(current) = self.store.get(id) {
            options = options.optimistic(Mutation::Replace(current.with_update(&update)));
        }
        self.store
            .run_entity(OperationKind::UPDATE, options, self.api.update_account(id, &update))
            .await
    }

    pub async fn adjust_balance(
        &self,
        id: &str,
        adjustment: BalanceAdjustment,
    ) -> Result<Account, CoreError> {
        let mut options = RunOptions::new().success_message("Balance adjusted");
        if let Some(current) = self.store.get(id) {
            let mut adjusted = (*current).clone();
            adjusted.balance = adjusted.balance.saturating_add(adjustment.delta);
            options = options.optimistic(Mutation::Replace(adjusted));
        }
        self.store
            .run_entity(
                OperationKind::ADJUST_BALANCE,
                options,
                self.api.adjust_balance(id, &adjustment),
            )
            .await
    }

    /// Take in an account the server returned from another domain's
    /// operation (a transaction moving its balance).
    pub fn absorb(&self, account: Account) {
        self.store.collection().upsert(account);
    }
}
