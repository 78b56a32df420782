// ── Lifecycle events ──
//
// Settled operations are announced on a `LifecycleBus`. Observers are
// called synchronously, in registration order, outside the registry lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use strum::Display;

use crate::store::OperationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleOutcome {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// Store that ran the operation (`"accounts"`, `"auth"`, ...).
    pub store: &'static str,
    pub kind: OperationKind,
    pub outcome: LifecycleOutcome,
    pub message: String,
    /// Successes flagged silent are not surfaced to the user.
    pub silent: bool,
    pub at: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn succeeded(
        store: &'static str,
        kind: OperationKind,
        message: impl Into<String>,
        silent: bool,
    ) -> Self {
        Self {
            store,
            kind,
            outcome: LifecycleOutcome::Succeeded,
            message: message.into(),
            silent,
            at: Utc::now(),
        }
    }

    pub fn failed(store: &'static str, kind: OperationKind, message: impl Into<String>) -> Self {
        Self {
            store,
            kind,
            outcome: LifecycleOutcome::Failed,
            message: message.into(),
            silent: false,
            at: Utc::now(),
        }
    }
}

pub trait LifecycleObserver: Send + Sync {
    fn on_event(&self, event: &LifecycleEvent);
}

impl<F> LifecycleObserver for F
where
    F: Fn(&LifecycleEvent) + Send + Sync,
{
    fn on_event(&self, event: &LifecycleEvent) {
        self(event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Registry = Vec<(ObserverId, Arc<dyn LifecycleObserver>)>;

#[derive(Default)]
pub struct LifecycleBus {
    observers: RwLock<Registry>,
    next_id: AtomicU64,
}

impl LifecycleBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn LifecycleObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn publish(&self, event: &LifecycleEvent) {
        let observers: Vec<Arc<dyn LifecycleObserver>> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();
        for observer in observers {
            observer.on_event(event);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
