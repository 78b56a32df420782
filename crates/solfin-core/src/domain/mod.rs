// ── Domain stores ──
//
// One store per domain, each a thin layer over `DomainStore<T>` that
// maps user intents onto API calls, optimistic mutations and success
// messages. Stores never reach into each other; cross-domain effects are
// forwarded by `AppContext`.

mod accounts;
mod auth;
mod budgets;
mod sols;
mod transactions;

pub use accounts::AccountStore;
pub use auth::AuthStore;
pub use budgets::BudgetStore;
pub use sols::SolStore;
pub use transactions::TransactionStore;
