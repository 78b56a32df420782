//! Reactive coordination layer between `solfin-api` and front ends.
//!
//! - **[`AppContext`]**: builds the client stack once and forwards
//!   cross-domain effects, such as the account a recorded transaction
//!   returns. It also resets every store when the session ends.
//!
//! - **Domain stores** ([`domain`]): auth, accounts, transactions, budgets
//!   and sols. Each wraps a [`DomainStore<T>`], whose lifecycle runner
//!   drives pending status, applies optimistic mutations, and rolls them
//!   back when the request fails or is dropped.
//!
//! - **[`EntityStream<T>`]**: subscription handle over a store's ordered
//!   collection, with `current()` / `latest()` / `changed()`.
//!
//! - **[`NotificationQueue`]**: position-grouped transient messages with
//!   per-item expiry and exit timers. It is fed by [`LifecycleBus`].

pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod events;
pub mod model;
pub mod notify;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::ClientConfig;
pub use context::AppContext;
pub use domain::{AccountStore, AuthStore, BudgetStore, SolStore, TransactionStore};
pub use error::CoreError;
pub use events::{LifecycleBus, LifecycleEvent, LifecycleObserver, LifecycleOutcome, ObserverId};
pub use notify::{
    Notification, NotificationConfig, NotificationId, NotificationKind, NotificationQueue,
    NotificationRequest, NotificationSnapshot, Phase, Position,
};
pub use store::{
    DomainStore, EntityCollection, Mutation, OperationKind, OperationState, OperationStatus,
    RunOptions,
};
pub use stream::EntityStream;

pub use model::{
    Account, AccountKind, AccountUpdate, BalanceAdjustment, Budget, BudgetPeriod, BudgetUpdate,
    Contribution, Entity, NewAccount, NewBudget, NewSol, NewTransaction, ProfileUpdate,
    RegisterRequest, Sol, SolFrequency, SolMember, SolStatus, SolUpdate, Transaction,
    TransactionKind, TransactionReceipt, TransactionUpdate, User,
};

// Session types front ends need to pick a storage backend.
pub use solfin_api::{FileStorage, MemoryStorage, SessionStorage, SessionStore};
