// ── Reactive entity streams ──
//
// Subscription types for consuming collection changes from a store.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Entity;
use crate::store::Snapshot;

/// A subscription to one store's entities.
///
/// Provides both point-in-time access and change notification via
/// [`changed`](Self::changed) or by converting into a `Stream`.
pub struct EntityStream<T: Entity> {
    current: Snapshot<T>,
    receiver: watch::Receiver<Snapshot<T>>,
}

impl<T: Entity> EntityStream<T> {
    pub(crate) fn new(mut receiver: watch::Receiver<Snapshot<T>>) -> Self {
        let current = receiver.borrow_and_update().clone();
        Self { current, receiver }
    }

    /// Entities as of creation or the last `changed()`.
    pub fn current(&self) -> Vec<Arc<T>> {
        self.current.values().cloned().collect()
    }

    /// Latest entities, which may be newer than `current()`.
    pub fn latest(&self) -> Vec<Arc<T>> {
        self.receiver.borrow().values().cloned().collect()
    }

    /// Wait for the next change. `None` once the store is dropped.
    pub async fn changed(&mut self) -> Option<Vec<Arc<T>>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap.values().cloned().collect())
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> EntityWatchStream<T> {
        EntityWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding the ordered entity list on every change,
/// starting with the current one.
pub struct EntityWatchStream<T: Entity> {
    inner: WatchStream<Snapshot<T>>,
}

impl<T: Entity> Stream for EntityWatchStream<T> {
    type Item = Vec<Arc<T>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner)
            .poll_next(cx)
            .map(|snap| snap.map(|s| s.values().cloned().collect()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use futures_util::StreamExt;

    use crate::events::LifecycleBus;
    use crate::model::{Budget, BudgetPeriod};
    use crate::store::DomainStore;

    fn budget(id: &str) -> Budget {
        Budget {
            id: id.into(),
            name: "Manje".into(),
            category: "food".into(),
            limit: 10_000,
            spent: 0,
            period: BudgetPeriod::Monthly,
            starts_on: None,
        }
    }

    #[tokio::test]
    async fn changed_yields_new_entities() {
        let store = DomainStore::new("budgets", Arc::new(LifecycleBus::new()));
        let mut stream = store.subscribe();
        assert!(stream.current().is_empty());

        store.collection().upsert(budget("b1"));
        let next = stream.changed().await.unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(stream.current()[0].id, "b1");
    }

    #[tokio::test]
    async fn into_stream_starts_with_current() {
        let store = DomainStore::new("budgets", Arc::new(LifecycleBus::new()));
        store.collection().upsert(budget("b1"));
        let mut stream = store.subscribe().into_stream();
        let first = stream.next().await.unwrap();
        assert_eq!(first[0].id, "b1");
    }
}
