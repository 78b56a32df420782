// ── Generic reactive entity collection ──
//
// Ordered id → entity map published through a `watch` channel. Every
// mutation copies on write (`Arc::make_mut`), so snapshots handed out
// earlier never change underneath their holders.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::watch;

use crate::model::Entity;

/// Prefix of client-generated ids for optimistic placeholders.
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Fresh placeholder id for an optimistic insert.
pub fn temp_id() -> String {
    format!("{TEMP_ID_PREFIX}{}", uuid::Uuid::new_v4())
}

pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Immutable, ordered view of a collection.
pub type Snapshot<T> = Arc<IndexMap<String, Arc<T>>>;

/// Reactive collection for a single entity type. Iteration order is the
/// last server order, with local inserts appended.
pub struct EntityCollection<T: Entity> {
    entries: watch::Sender<Snapshot<T>>,
}

impl<T: Entity> Default for EntityCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> EntityCollection<T> {
    pub fn new() -> Self {
        let (entries, _) = watch::channel(Arc::new(IndexMap::new()));
        Self { entries }
    }

    /// Insert or replace in place. Returns the previous entity.
    pub fn upsert(&self, entity: T) -> Option<Arc<T>> {
        let mut previous = None;
        self.entries.send_modify(|snap| {
            let map = Arc::make_mut(snap);
            previous = map.insert(entity.id().to_owned(), Arc::new(entity));
        });
        previous
    }

    /// Replace the contents with a fresh server listing, keeping its
    /// order. Placeholders of in-flight creates survive at the end.
    pub fn replace_all(&self, entities: Vec<T>) {
        self.entries.send_modify(|snap| {
            let placeholders: Vec<(String, Arc<T>)> = snap
                .iter()
                .filter(|(id, _)| is_temp_id(id))
                .map(|(id, e)| (id.clone(), Arc::clone(e)))
                .collect();

            let mut next: IndexMap<String, Arc<T>> = entities
                .into_iter()
                .map(|e| (e.id().to_owned(), Arc::new(e)))
                .collect();
            next.extend(placeholders);
            *snap = Arc::new(next);
        });
    }

    /// Swap a placeholder for the server-confirmed entity, keeping the
    /// placeholder's position. Falls back to an upsert when the
    /// placeholder is gone.
    pub fn confirm(&self, placeholder: &str, entity: T) {
        self.entries.send_modify(|snap| {
            let map = Arc::make_mut(snap);
            let id = entity.id().to_owned();
            let entity = Arc::new(entity);
            match map.get_index_of(placeholder) {
                Some(_) if placeholder == id => {
                    map.insert(id, entity);
                }
                Some(index) if !map.contains_key(&id) => {
                    map.shift_remove_index(index);
                    map.shift_insert(index, id, entity);
                }
                Some(_) => {
                    map.shift_remove(placeholder);
                    map.insert(id, entity);
                }
                None => {
                    map.insert(id, entity);
                }
            }
        });
    }

    /// Remove by id, returning the entity and the position it held.
    pub fn remove(&self, id: &str) -> Option<(usize, Arc<T>)> {
        let mut removed = None;
        self.entries.send_if_modified(|snap| {
            if !snap.contains_key(id) {
                return false;
            }
            removed = Arc::make_mut(snap)
                .shift_remove_full(id)
                .map(|(index, _, entity)| (index, entity));
            true
        });
        removed
    }

    /// Put `entity` back at `index` (clamped), or overwrite it in place
    /// if its id is present.
    pub fn restore(&self, index: usize, entity: Arc<T>) {
        self.entries.send_modify(|snap| {
            let map = Arc::make_mut(snap);
            let id = entity.id().to_owned();
            if let Some(slot) = map.get_mut(&id) {
                *slot = entity;
            } else {
                let index = index.min(map.len());
                map.shift_insert(index, id, entity);
            }
        });
    }

    pub fn clear(&self) {
        self.entries.send_if_modified(|snap| {
            if snap.is_empty() {
                return false;
            }
            *snap = Arc::new(IndexMap::new());
            true
        });
    }

    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.entries.borrow().get(id).cloned()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.entries.borrow().get_index_of(id)
    }

    /// Current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Snapshot<T> {
        self.entries.borrow().clone()
    }

    /// Entities in order.
    pub fn values(&self) -> Vec<Arc<T>> {
        self.entries.borrow().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.entries.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::Budget;
    use pretty_assertions::assert_eq;

    fn budget(id: &str, limit: i64) -> Budget {
        Budget {
            id: id.into(),
            name: format!("budget {id}"),
            category: "food".into(),
            limit,
            spent: 0,
            period: crate::model::BudgetPeriod::Monthly,
            starts_on: None,
        }
    }

    fn ids(col: &EntityCollection<Budget>) -> Vec<String> {
        col.snapshot().keys().cloned().collect()
    }

    #[test]
    fn upsert_replaces_in_place() {
        let col = EntityCollection::new();
        col.upsert(budget("a", 1));
        col.upsert(budget("b", 2));
        let previous = col.upsert(budget("a", 10));
        assert_eq!(previous.unwrap().limit, 1);
        assert_eq!(ids(&col), vec!["a", "b"]);
        assert_eq!(col.get("a").unwrap().limit, 10);
    }

    #[test]
    fn replace_all_keeps_server_order_and_placeholders() {
        let col = EntityCollection::new();
        col.upsert(budget("old", 1));
        col.upsert(budget("tmp-1", 5));
        col.replace_all(vec![budget("c", 3), budget("a", 1), budget("b", 2)]);
        assert_eq!(ids(&col), vec!["c", "a", "b", "tmp-1"]);
    }

    #[test]
    fn confirm_swaps_placeholder_at_same_position() {
        let col = EntityCollection::new();
        col.upsert(budget("a", 1));
        col.upsert(budget("tmp-x", 2));
        col.upsert(budget("b", 3));
        col.confirm("tmp-x", budget("srv-9", 2));
        assert_eq!(ids(&col), vec!["a", "srv-9", "b"]);
    }

    #[test]
    fn confirm_when_server_id_already_listed() {
        let col = EntityCollection::new();
        col.upsert(budget("tmp-x", 2));
        col.upsert(budget("srv-9", 2));
        col.confirm("tmp-x", budget("srv-9", 7));
        assert_eq!(ids(&col), vec!["srv-9"]);
        assert_eq!(col.get("srv-9").unwrap().limit, 7);
    }

    #[test]
    fn remove_then_restore_is_identity() {
        let col = EntityCollection::new();
        for id in ["a", "b", "c"] {
            col.upsert(budget(id, 1));
        }
        let before = col.snapshot();
        let (index, entity) = col.remove("b").unwrap();
        assert_eq!(index, 1);
        col.restore(index, entity);
        assert_eq!(col.snapshot(), before);
        assert_eq!(ids(&col), vec!["a", "b", "c"]);
    }

    #[test]
    fn snapshots_are_not_mutated_later() {
        let col = EntityCollection::new();
        col.upsert(budget("a", 1));
        let snap = col.snapshot();
        col.upsert(budget("b", 2));
        assert_eq!(snap.len(), 1);
        assert_eq!(col.len(), 2);
    }

    #[test]
    fn temp_ids_are_recognised() {
        let id = temp_id();
        assert!(is_temp_id(&id));
        assert!(!is_temp_id("acc_123"));
    }
}
