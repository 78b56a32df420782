use std::ops::Deref;
use std::sync::Arc;

use solfin_api::ApiClient;

use crate::error::CoreError;
use crate::events::LifecycleBus;
use crate::model::{Budget, BudgetUpdate, NewBudget};
use crate::store::{DomainStore, Mutation, OperationKind, RunOptions, temp_id};

pub struct BudgetStore {
    store: DomainStore<Budget>,
    api: ApiClient,
}

impl Deref for BudgetStore {
    type Target = DomainStore<Budget>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl BudgetStore {
    pub fn new(api: ApiClient, bus: Arc<LifecycleBus>) -> Self {
        Self {
            store: DomainStore::new("budgets", bus),
            api,
        }
    }

    pub async fn fetch_all(&self) -> Result<Vec<Budget>, CoreError> {
        self.store
            .run_list(OperationKind::FETCH, RunOptions::quiet(), self.api.list_budgets())
            .await
    }

    pub async fn create(&self, budget: NewBudget) -> Result<Budget, CoreError> {
        let placeholder = Budget {
            id: temp_id(),
            name: budget.name.clone(),
            category: budget.category.clone(),
            limit: budget.limit,
            spent: 0,
            period: budget.period,
            starts_on: budget.starts_on,
        };
        let options = RunOptions::new()
            .optimistic(Mutation::Insert(placeholder))
            .success_message("Budget created");
        self.store
            .run_entity(OperationKind::CREATE, options, self.api.create_budget(&budget))
            .await
    }

    pub async fn update(&self, id: &str, update: BudgetUpdate) -> Result<Budget, CoreError> {
        let mut options = RunOptions::new().success_message("Budget updated");
        if let Some(current) = self.store.get(id) {
            options = options.optimistic(Mutation::Replace(current.with_update(&update)));
        }
        self.store
            .run_entity(OperationKind::UPDATE, options, self.api.update_budget(id, &update))
            .await
    }
}
