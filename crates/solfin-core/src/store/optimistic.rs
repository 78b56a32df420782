// ── Optimistic mutations ──
//
// A `Mutation` is applied to a collection before the server confirms;
// applying it yields the `Rollback` that undoes exactly that entity and
// nothing else, so concurrent optimistic writes roll back independently.

use std::sync::Arc;

use super::collection::EntityCollection;
use crate::model::Entity;

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<T> {
    /// Add a new entity, usually carrying a placeholder id.
    Insert(T),
    /// Overwrite an existing entity with a locally edited copy.
    Replace(T),
    /// Drop an entity by id.
    Remove(String),
}

/// Inverse of one applied [`Mutation`].
#[derive(Debug, Clone, PartialEq)]
pub enum Rollback<T> {
    /// Undo an insert by removing the id it added.
    RemoveInserted { id: String },
    /// Put back the entity that was overwritten or removed.
    Restore { index: usize, previous: Arc<T> },
    /// The mutation changed nothing.
    Noop,
}

impl<T: Entity> Mutation<T> {
    pub fn apply(self, collection: &EntityCollection<T>) -> Rollback<T> {
        match self {
            Self::Insert(entity) | Self::Replace(entity) => {
                let id = entity.id().to_owned();
                let index = collection.index_of(&id);
                match (collection.upsert(entity), index) {
                    (Some(previous), Some(index)) => Rollback::Restore { index, previous },
                    _ => Rollback::RemoveInserted { id },
                }
            }
            Self::Remove(id) => match collection.remove(&id) {
                Some((index, previous)) => Rollback::Restore { index, previous },
                None => Rollback::Noop,
            },
        }
    }
}

impl<T: Entity> Rollback<T> {
    pub fn undo(self, collection: &EntityCollection<T>) {
        match self {
            Self::RemoveInserted { id } => {
                collection.remove(&id);
            }
            Self::Restore { index, previous } => collection.restore(index, previous),
            Self::Noop => {}
        }
    }

    /// Id of the entity an optimistic insert added, to be swapped for
    /// the confirmed one.
    pub fn placeholder_id(&self) -> Option<&str> {
        match self {
            Self::RemoveInserted { id } => Some(id),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Account, AccountKind};
    use crate::store::collection::temp_id;

    fn account(id: &str, balance: i64) -> Account {
        Account {
            id: id.into(),
            name: "Courant".into(),
            kind: AccountKind::Checking,
            currency: "HTG".into(),
            balance,
            archived: false,
            updated_at: None,
        }
    }

    #[test]
    fn insert_rollback_removes_only_its_entity() {
        let col = EntityCollection::new();
        col.upsert(account("a", 100));
        let first = Mutation::Insert(account(&temp_id(), 1)).apply(&col);
        let second = Mutation::Insert(account(&temp_id(), 2)).apply(&col);
        assert_eq!(col.len(), 3);

        first.undo(&col);
        assert_eq!(col.len(), 2);
        assert!(col.get(second.placeholder_id().unwrap()).is_some());
    }

    #[test]
    fn replace_rollback_restores_previous_value() {
        let col = EntityCollection::new();
        col.upsert(account("a", 100));
        col.upsert(account("b", 5));
        let before = col.values();

        let rollback = Mutation::Replace(account("a", 900)).apply(&col);
        assert_eq!(col.get("a").unwrap().balance, 900);
        rollback.undo(&col);
        assert_eq!(col.values(), before);
    }

    #[test]
    fn remove_rollback_reinserts_at_index() {
        let col = EntityCollection::new();
        for id in ["a", "b", "c"] {
            col.upsert(account(id, 0));
        }
        let before = col.values();
        let rollback = Mutation::<Account>::Remove("b".into()).apply(&col);
        assert!(col.get("b").is_none());
        rollback.undo(&col);
        assert_eq!(col.values(), before);
    }

    #[test]
    fn removing_missing_entity_is_noop() {
        let col: EntityCollection<Account> = EntityCollection::new();
        let rollback = Mutation::Remove("ghost".into()).apply(&col);
        assert_eq!(rollback, Rollback::Noop);
    }
}
