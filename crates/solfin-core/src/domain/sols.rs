use std::ops::Deref;
use std::sync::Arc;

use solfin_api::ApiClient;

use crate::error::CoreError;
use crate::events::LifecycleBus;
use crate::model::{Contribution, NewSol, Sol, SolStatus, SolUpdate};
use crate::store::{DomainStore, Mutation, OperationKind, RunOptions, temp_id};

pub struct SolStore {
    store: DomainStore<Sol>,
    api: ApiClient,
}

impl Deref for SolStore {
    type Target = DomainStore<Sol>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl SolStore {
    pub fn new(api: ApiClient, bus: Arc<LifecycleBus>) -> Self {
        Self {
            store: DomainStore::new("sols", bus),
            api,
        }
    }

    pub async fn fetch_all(&self) -> Result<Vec<Sol>, CoreError> {
        self.store
            .run_list(OperationKind::FETCH, RunOptions::quiet(), self.api.list_sols())
            .await
    }

    pub async fn fetch_one(&self, id: &str) -> Result<Sol, CoreError> {
        self.store
            .run_entity(OperationKind::FETCH_ONE, RunOptions::quiet(), self.api.get_sol(id))
            .await
    }

    /// Membership and rounds are assigned by the server; the placeholder
    /// starts empty.
    pub async fn create(&self, sol: NewSol) -> Result<Sol, CoreError> {
        let placeholder = Sol {
            id: temp_id(),
            name: sol.name.clone(),
            contribution: sol.contribution,
            currency: sol.currency.clone(),
            frequency: sol.frequency,
            members: Vec::new(),
            current_round: 0,
            status: SolStatus::Pending,
        };
        let options = RunOptions::new()
            .optimistic(Mutation::Insert(placeholder))
            .success_message("Sol created");
        self.store
            .run_entity(OperationKind::CREATE, options, self.api.create_sol(&sol))
            .await
    }

    pub async fn update(&self, id: &str, update: SolUpdate) -> Result<Sol, CoreError> {
        let mut options = RunOptions::new().success_message("Sol updated");
        if let Some(current) = self.store.get(id) {
            options = options.optimistic(Mutation::Replace(current.with_update(&update)));
        }
        self.store
            .run_entity(OperationKind::UPDATE, options, self.api.update_sol(id, &update))
            .await
    }

    pub async fn join(&self, id: &str) -> Result<Sol, CoreError> {
        self.store
            .run_entity(
                OperationKind::JOIN,
                RunOptions::new().success_message("You joined the sol"),
                self.api.join_sol(id),
            )
            .await
    }

    pub async fn contribute(&self, id: &str, contribution: Contribution) -> Result<Sol, CoreError> {
        self.store
            .run_entity(
                OperationKind::CONTRIBUTE,
                RunOptions::new(),
                self.api.contribute_to_sol(id, &contribution),
            )
            .await
    }
}
