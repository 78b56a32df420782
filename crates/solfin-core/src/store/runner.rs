// ── Operation lifecycle runner ──
//
// Every domain operation goes through `DomainStore::run`:
//
//   optimistic mutation → pending → await → merge | rollback → event
//
// Same-kind calls are not serialized; the last one to settle owns the
// status record. Rollbacks are entity-scoped, so overlapping optimistic
// writes never undo each other.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use solfin_api::Confirmed;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::collection::{EntityCollection, Snapshot};
use super::optimistic::{Mutation, Rollback};
use super::status::{OperationKind, OperationStatus, StatusBoard};
use crate::error::CoreError;
use crate::events::{LifecycleBus, LifecycleEvent};
use crate::model::Entity;
use crate::stream::EntityStream;

/// Per-call knobs for [`DomainStore::run`].
#[derive(Debug, Clone)]
pub struct RunOptions<T> {
    pub optimistic: Option<Mutation<T>>,
    pub success_message: Option<String>,
    pub silent: bool,
}

impl<T> Default for RunOptions<T> {
    fn default() -> Self {
        Self {
            optimistic: None,
            success_message: None,
            silent: false,
        }
    }
}

impl<T> RunOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads: no success notification.
    pub fn quiet() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }

    pub fn optimistic(mut self, mutation: Mutation<T>) -> Self {
        self.optimistic = Some(mutation);
        self
    }

    pub fn success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = Some(message.into());
        self
    }
}

/// Entity collection, status records and lifecycle plumbing of one
/// domain.
pub struct DomainStore<T: Entity> {
    name: &'static str,
    collection: EntityCollection<T>,
    statuses: StatusBoard,
    bus: Arc<LifecycleBus>,
    /// Bumped by `reset`; operations started in an older epoch settle
    /// without touching the store.
    epoch: AtomicU64,
}

impl<T: Entity> DomainStore<T> {
    pub fn new(name: &'static str, bus: Arc<LifecycleBus>) -> Self {
        Self {
            name,
            collection: EntityCollection::new(),
            statuses: StatusBoard::new(),
            bus,
            epoch: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Entities in last server order.
    pub fn all(&self) -> Vec<Arc<T>> {
        self.collection.values()
    }

    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.collection.get(id)
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        self.collection.snapshot()
    }

    pub fn collection(&self) -> &EntityCollection<T> {
        &self.collection
    }

    pub fn status_of(&self, kind: OperationKind) -> OperationStatus {
        self.statuses.get(kind)
    }

    pub fn subscribe(&self) -> EntityStream<T> {
        EntityStream::new(self.collection.subscribe())
    }

    pub fn subscribe_status(&self) -> watch::Receiver<u64> {
        self.statuses.subscribe()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Drop all entities and return every status to idle. Operations
    /// still in flight settle without merging, rolling back or touching
    /// their status.
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.collection.clear();
        self.statuses.reset();
    }

    /// Run one operation through the lifecycle.
    ///
    /// `merge` receives the collection, the confirmed payload and the
    /// placeholder id of the optimistic insert, if any. Dropping the
    /// returned future mid-flight rolls back and returns the status to
    /// idle.
    pub async fn run<R, E, F, M>(
        &self,
        kind: OperationKind,
        options: RunOptions<T>,
        future: F,
        merge: M,
    ) -> Result<R, CoreError>
    where
        F: Future<Output = Result<Confirmed<R>, E>>,
        E: Into<CoreError>,
        M: FnOnce(&EntityCollection<T>, &R, Option<&str>),
    {
        let RunOptions {
            optimistic,
            success_message,
            silent,
        } = options;

        let epoch = self.epoch();
        let rollback = optimistic.map(|m| m.apply(&self.collection));
        self.statuses.set(kind, OperationStatus::pending());
        debug!(store = self.name, %kind, optimistic = rollback.is_some(), "operation started");

        let in_flight = InFlight {
            store: self,
            kind,
            rollback,
            epoch,
            armed: true,
        };
        let outcome = future.await.map_err(Into::into);
        let rollback = in_flight.settle();

        if self.epoch() != epoch {
            debug!(store = self.name, %kind, "store reset while in flight, discarding outcome");
            return outcome.map(|confirmed| confirmed.data);
        }

        match outcome {
            Ok(Confirmed { data, message }) => {
                let placeholder = rollback.as_ref().and_then(Rollback::placeholder_id);
                merge(&self.collection, &data, placeholder);

                let message = message
                    .filter(|m| !m.trim().is_empty())
                    .or(success_message)
                    .unwrap_or_else(|| kind.default_success_message().to_owned());
                self.statuses
                    .set(kind, OperationStatus::succeeded(message.clone()));
                debug!(store = self.name, %kind, "operation succeeded");
                self.bus
                    .publish(&LifecycleEvent::succeeded(self.name, kind, message, silent));
                Ok(data)
            }
            Err(err) => {
                if let Some(rollback) = rollback {
                    rollback.undo(&self.collection);
                }
                let message = err.user_message();
                self.statuses.set(kind, OperationStatus::failed(message.clone()));
                warn!(store = self.name, %kind, error = %err, "operation failed");
                self.bus
                    .publish(&LifecycleEvent::failed(self.name, kind, message));
                Err(err)
            }
        }
    }

    /// Single-entity operation: the confirmed entity replaces the
    /// placeholder, or is upserted.
    pub async fn run_entity<E, F>(
        &self,
        kind: OperationKind,
        options: RunOptions<T>,
        future: F,
    ) -> Result<T, CoreError>
    where
        F: Future<Output = Result<Confirmed<T>, E>>,
        E: Into<CoreError>,
    {
        self.run(kind, options, future, merge_entity).await
    }

    /// Listing operation: the confirmed list replaces the collection.
    pub async fn run_list<E, F>(
        &self,
        kind: OperationKind,
        options: RunOptions<T>,
        future: F,
    ) -> Result<Vec<T>, CoreError>
    where
        F: Future<Output = Result<Confirmed<Vec<T>>, E>>,
        E: Into<CoreError>,
    {
        self.run(kind, options, future, |collection, list: &Vec<T>, _| {
            collection.replace_all(list.clone());
        })
        .await
    }
}

/// Put a confirmed entity in place of its placeholder.
pub fn merge_entity<T: Entity>(
    collection: &EntityCollection<T>,
    entity: &T,
    placeholder: Option<&str>,
) {
    match placeholder {
        Some(placeholder) => collection.confirm(placeholder, entity.clone()),
        None => {
            collection.upsert(entity.clone());
        }
    }
}

/// Undoes the optimistic mutation if the run future is dropped before
/// it settles.
struct InFlight<'a, T: Entity> {
    store: &'a DomainStore<T>,
    kind: OperationKind,
    rollback: Option<Rollback<T>>,
    epoch: u64,
    armed: bool,
}

impl<T: Entity> InFlight<'_, T> {
    fn settle(mut self) -> Option<Rollback<T>> {
        self.armed = false;
        self.rollback.take()
    }
}

impl<T: Entity> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if !self.armed || self.store.epoch() != self.epoch {
            return;
        }
        if let Some(rollback) = self.rollback.take() {
            rollback.undo(&self.store.collection);
        }
        self.store.statuses.set(self.kind, OperationStatus::idle());
        debug!(store = self.store.name, kind = %self.kind, "operation cancelled");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::events::LifecycleOutcome;
    use crate::model::{Transaction, TransactionKind};
    use crate::store::collection::temp_id;
    use crate::store::status::OperationState;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::time::Duration;

    fn tx(id: &str, amount: i64) -> Transaction {
        Transaction {
            id: id.into(),
            account_id: "a1".into(),
            kind: TransactionKind::Expense,
            amount,
            label: "Tap-tap".into(),
            category: None,
            occurred_at: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
            budget_id: None,
        }
    }

    fn rejected(message: &str) -> CoreError {
        CoreError::Validation {
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    fn store() -> (DomainStore<Transaction>, Arc<Mutex<Vec<LifecycleEvent>>>) {
        let bus = Arc::new(LifecycleBus::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        bus.subscribe(Arc::new(move |e: &LifecycleEvent| {
            sink.lock().unwrap().push(e.clone());
        }));
        (DomainStore::new("transactions", bus), events)
    }

    #[tokio::test]
    async fn success_goes_pending_then_succeeded_with_message() {
        let (store, events) = store();
        let mut status = store.subscribe_status();

        let future = async {
            tokio::task::yield_now().await;
            Ok::<_, CoreError>(Confirmed::new(tx("t1", 100)))
        };
        let run = store.run_entity(OperationKind::CREATE, RunOptions::new(), future);
        tokio::pin!(run);

        // first poll applies pending and parks on the yield
        assert!(futures_util::poll!(run.as_mut()).is_pending());
        assert_eq!(store.status_of(OperationKind::CREATE).state, OperationState::Pending);
        status.borrow_and_update();

        let created = run.await.unwrap();
        assert_eq!(created.id, "t1");
        let settled = store.status_of(OperationKind::CREATE);
        assert_eq!(settled.state, OperationState::Succeeded);
        assert_eq!(settled.success_message.as_deref(), Some("Created"));
        assert!(status.has_changed().unwrap());

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, LifecycleOutcome::Succeeded);
    }

    #[tokio::test]
    async fn server_message_wins_over_defaults() {
        let (store, _) = store();
        let future = async {
            Ok::<_, CoreError>(Confirmed::with_message(tx("t1", 1), "Dépense enregistrée"))
        };
        store
            .run_entity(
                OperationKind::CREATE,
                RunOptions::new().success_message("Transaction added"),
                future,
            )
            .await
            .unwrap();
        assert_eq!(
            store.status_of(OperationKind::CREATE).success_message.as_deref(),
            Some("Dépense enregistrée")
        );
    }

    #[tokio::test]
    async fn failed_optimistic_insert_restores_snapshot() {
        let (store, events) = store();
        store.collection().upsert(tx("t0", 5));
        let before = store.all();

        let result = store
            .run_entity(
                OperationKind::CREATE,
                RunOptions::new().optimistic(Mutation::Insert(tx(&temp_id(), 100))),
                async { Err::<Confirmed<Transaction>, _>(rejected("Amount too large")) },
            )
            .await;

        assert!(result.is_err());
        assert_eq!(store.all(), before);
        let status = store.status_of(OperationKind::CREATE);
        assert_eq!(status.state, OperationState::Failed);
        assert_eq!(status.error_message.as_deref(), Some("Amount too large"));
        assert_eq!(events.lock().unwrap()[0].outcome, LifecycleOutcome::Failed);
    }

    #[tokio::test]
    async fn confirmed_insert_replaces_placeholder() {
        let (store, _) = store();
        let placeholder = temp_id();
        store
            .run_entity(
                OperationKind::CREATE,
                RunOptions::new().optimistic(Mutation::Insert(tx(&placeholder, 100))),
                async { Ok::<_, CoreError>(Confirmed::new(tx("srv-1", 100))) },
            )
            .await
            .unwrap();

        assert!(store.get(&placeholder).is_none());
        assert_eq!(store.all().len(), 1);
        assert_eq!(store.all()[0].id, "srv-1");
    }

    #[tokio::test(start_paused = true)]
    async fn racing_creates_last_settled_wins_and_rollback_is_independent() {
        let (store, _) = store();
        let slow_id = temp_id();
        let fast_id = temp_id();

        let slow = store.run_entity(
            OperationKind::CREATE,
            RunOptions::new().optimistic(Mutation::Insert(tx(&slow_id, 1))),
            async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, CoreError>(Confirmed::new(tx("srv-slow", 1)))
            },
        );
        let fast = store.run_entity(
            OperationKind::CREATE,
            RunOptions::new().optimistic(Mutation::Insert(tx(&fast_id, 2))),
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err::<Confirmed<Transaction>, _>(rejected("Duplicate"))
            },
        );

        let (slow, fast) = tokio::join!(slow, fast);
        assert!(slow.is_ok());
        assert!(fast.is_err());

        // the failed insert was rolled back without touching the other one
        let ids: Vec<String> = store.all().iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec!["srv-slow".to_owned()]);
        // slow settled last
        assert_eq!(
            store.status_of(OperationKind::CREATE).state,
            OperationState::Succeeded
        );
    }

    #[tokio::test]
    async fn dropped_run_rolls_back_and_resets_status() {
        let (store, events) = store();
        let placeholder = temp_id();
        {
            let run = store.run_entity(
                OperationKind::CREATE,
                RunOptions::new().optimistic(Mutation::Insert(tx(&placeholder, 1))),
                std::future::pending::<Result<Confirmed<Transaction>, CoreError>>(),
            );
            tokio::pin!(run);
            assert!(futures_util::poll!(run.as_mut()).is_pending());
            assert!(store.get(&placeholder).is_some());
        }
        assert!(store.get(&placeholder).is_none());
        assert_eq!(store.status_of(OperationKind::CREATE), OperationStatus::idle());
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_during_flight_discards_the_outcome() {
        let (store, events) = store();
        let (tx_list, rx_list) = tokio::sync::oneshot::channel::<Vec<Transaction>>();
        let future = async move {
            let list = rx_list.await.unwrap();
            Ok::<_, CoreError>(Confirmed::new(list))
        };
        let run = store.run_list(OperationKind::FETCH, RunOptions::new(), future);
        tokio::pin!(run);
        assert!(futures_util::poll!(run.as_mut()).is_pending());

        store.reset();
        tx_list.send(vec![tx("t1", 100)]).unwrap();
        let listed = run.await.unwrap();

        assert_eq!(listed.len(), 1);
        assert!(store.all().is_empty());
        assert_eq!(store.status_of(OperationKind::FETCH), OperationStatus::idle());
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_during_flight_skips_rollback_of_stale_insert() {
        let (store, _) = store();
        let placeholder = temp_id();
        let (tx_done, rx_done) = tokio::sync::oneshot::channel::<()>();
        let future = async move {
            rx_done.await.unwrap();
            Err::<Confirmed<Transaction>, _>(rejected("Duplicate"))
        };
        let run = store.run_entity(
            OperationKind::CREATE,
            RunOptions::new().optimistic(Mutation::Insert(tx(&placeholder, 1))),
            future,
        );
        tokio::pin!(run);
        assert!(futures_util::poll!(run.as_mut()).is_pending());

        store.reset();
        store.collection().upsert(tx("fresh", 2));
        tx_done.send(()).unwrap();
        assert!(run.await.is_err());

        let ids: Vec<String> = store.all().iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec!["fresh".to_owned()]);
        assert_eq!(store.status_of(OperationKind::CREATE), OperationStatus::idle());
    }

    #[tokio::test]
    async fn list_replaces_collection() {
        let (store, events) = store();
        store.collection().upsert(tx("stale", 1));
        let listed = store
            .run_list(
                OperationKind::FETCH,
                RunOptions::quiet(),
                async { Ok::<_, CoreError>(Confirmed::new(vec![tx("b", 2), tx("a", 1)])) },
            )
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        let ids: Vec<String> = store.all().iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec!["b".to_owned(), "a".to_owned()]);
        assert!(events.lock().unwrap()[0].silent);
    }
}
