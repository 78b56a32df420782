// ── Domain model ──
//
// Entities are the API wire types; core only adds the identity contract
// the collections need.

pub use solfin_api::models::{
    Account, AccountKind, AccountUpdate, BalanceAdjustment, Budget, BudgetPeriod, BudgetUpdate,
    Contribution, NewAccount, NewBudget, NewSol, NewTransaction, ProfileUpdate, RegisterRequest,
    Sol, SolFrequency, SolMember, SolStatus, SolUpdate, Transaction, TransactionKind,
    TransactionReceipt, TransactionUpdate, User,
};

/// A record keyed by a string id inside an `EntityCollection`.
pub trait Entity: Clone + PartialEq + Send + Sync + 'static {
    fn id(&self) -> &str;
}

macro_rules! impl_entity {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Entity for $ty {
                fn id(&self) -> &str {
                    &self.id
                }
            }
        )+
    };
}

impl_entity!(Account, Transaction, Budget, Sol, User);
