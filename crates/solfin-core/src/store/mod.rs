// ── Reactive domain stores ──
//
// `EntityCollection` holds the entities, `StatusBoard` the per-kind
// operation status, and `DomainStore` ties both to the lifecycle runner.

mod collection;
mod optimistic;
mod runner;
mod status;

pub use collection::{EntityCollection, Snapshot, TEMP_ID_PREFIX, is_temp_id, temp_id};
pub use optimistic::{Mutation, Rollback};
pub use runner::{DomainStore, RunOptions, merge_entity};
pub use status::{OperationKind, OperationState, OperationStatus, StatusBoard};
