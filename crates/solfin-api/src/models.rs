// Wire types for the solfin API.
//
// Amounts are integer minor units (cents) to keep balances exact.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::session::CredentialPair;

/// Access-token lifetime assumed when the server omits any expiry hint.
const DEFAULT_ACCESS_TTL_SECS: i64 = 15 * 60;

// ── Auth ─────────────────────────────────────────────────────────────

/// Profile snapshot of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.clone()
        } else {
            full.to_owned()
        }
    }
}

/// Body returned by login, register and refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Seconds until the access token expires.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Absolute expiry; wins over `expires_in` when both are present.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<User>,
}

impl TokenResponse {
    /// Validate and split into a credential pair and optional user.
    ///
    /// Missing tokens make the response malformed.
    pub fn into_credentials(
        self,
        now: DateTime<Utc>,
    ) -> Result<(CredentialPair, Option<User>), Error> {
        if self.access_token.trim().is_empty() || self.refresh_token.trim().is_empty() {
            return Err(Error::Deserialization {
                message: "token response is missing access_token or refresh_token".into(),
                body: String::new(),
            });
        }

        let access_expiry = match self.expires_at {
            Some(at) => at,
            None => {
                let ttl = self.expires_in.unwrap_or(DEFAULT_ACCESS_TTL_SECS);
                Duration::try_seconds(ttl)
                    .and_then(|ttl| now.checked_add_signed(ttl))
                    .ok_or_else(|| Error::Deserialization {
                        message: format!("token response has an out-of-range expires_in ({ttl})"),
                        body: String::new(),
                    })?
            }
        };

        let pair = CredentialPair {
            access_token: SecretString::from(self.access_token),
            refresh_token: SecretString::from(self.refresh_token),
            access_expiry,
        };
        Ok((pair, self.user))
    }
}

/// Sign-up form. Serialized by hand so the password is only exposed
/// while building the request body.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub email: String,
    pub password: SecretString,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

// ── Accounts ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    #[default]
    Checking,
    Savings,
    Cash,
    MobileMoney,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: AccountKind,
    pub currency: String,
    /// Minor units.
    #[serde(default)]
    pub balance: i64,
    #[serde(default)]
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Apply a partial update locally (used for optimistic edits).
    pub fn with_update(&self, update: &AccountUpdate) -> Self {
        let mut next = self.clone();
        if let Some(name) = &update.name {
            next.name.clone_from(name);
        }
        if let Some(kind) = update.kind {
            next.kind = kind;
        }
        if let Some(archived) = update.archived {
            next.archived = archived;
        }
        next
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAccount {
    pub name: String,
    pub kind: AccountKind,
    pub currency: String,
    /// Opening balance, minor units.
    pub initial_balance: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<AccountKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

/// Manual correction of an account balance.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceAdjustment {
    /// Signed delta, minor units.
    pub delta: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ── Transactions ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    #[default]
    Expense,
    Transfer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    #[serde(default)]
    pub kind: TransactionKind,
    /// Minor units, always positive; `kind` carries the direction.
    pub amount: i64,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_id: Option<String>,
}

impl Transaction {
    pub fn with_update(&self, update: &TransactionUpdate) -> Self {
        let mut next = self.clone();
        if let Some(amount) = update.amount {
            next.amount = amount;
        }
        if let Some(label) = &update.label {
            next.label.clone_from(label);
        }
        if let Some(category) = &update.category {
            next.category = Some(category.clone());
        }
        if let Some(occurred_at) = update.occurred_at {
            next.occurred_at = occurred_at;
        }
        next
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTransaction {
    pub account_id: String,
    pub kind: TransactionKind,
    pub amount: i64,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub occurred_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransactionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Result of a transaction write. The server includes the affected
/// account when its balance changed; callers forward it to the account
/// store themselves.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "ReceiptWire")]
pub struct TransactionReceipt {
    pub transaction: Transaction,
    pub account: Option<Account>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReceiptWire {
    Wrapped {
        transaction: Transaction,
        #[serde(default)]
        account: Option<Account>,
    },
    Bare(Transaction),
}

impl From<ReceiptWire> for TransactionReceipt {
    fn from(wire: ReceiptWire) -> Self {
        match wire {
            ReceiptWire::Wrapped {
                transaction,
                account,
            } => Self {
                transaction,
                account,
            },
            ReceiptWire::Bare(transaction) => Self {
                transaction,
                account: None,
            },
        }
    }
}

// ── Budgets ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    /// Minor units.
    pub limit: i64,
    #[serde(default)]
    pub spent: i64,
    #[serde(default)]
    pub period: BudgetPeriod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_on: Option<NaiveDate>,
}

impl Budget {
    pub fn remaining(&self) -> i64 {
        self.limit - self.spent
    }

    pub fn with_update(&self, update: &BudgetUpdate) -> Self {
        let mut next = self.clone();
        if let Some(name) = &update.name {
            next.name.clone_from(name);
        }
        if let Some(limit) = update.limit {
            next.limit = limit;
        }
        if let Some(period) = update.period {
            next.period = period;
        }
        next
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewBudget {
    pub name: String,
    pub category: String,
    pub limit: i64,
    pub period: BudgetPeriod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BudgetUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<BudgetPeriod>,
}

// ── Sols (rotating savings groups) ───────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolFrequency {
    Weekly,
    #[default]
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolStatus {
    #[default]
    Pending,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolMember {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    /// Payout order, 1-based.
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub has_received: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sol {
    pub id: String,
    pub name: String,
    /// Per-round contribution, minor units.
    pub contribution: i64,
    pub currency: String,
    #[serde(default)]
    pub frequency: SolFrequency,
    #[serde(default)]
    pub members: Vec<SolMember>,
    #[serde(default)]
    pub current_round: u32,
    #[serde(default)]
    pub status: SolStatus,
}

impl Sol {
    pub fn with_update(&self, update: &SolUpdate) -> Self {
        let mut next = self.clone();
        if let Some(name) = &update.name {
            next.name.clone_from(name);
        }
        if let Some(contribution) = update.contribution {
            next.contribution = contribution;
        }
        if let Some(frequency) = update.frequency {
            next.frequency = frequency;
        }
        next
    }

    /// Amount collected by the beneficiary of one round.
    pub fn pot(&self) -> i64 {
        self.contribution
            .saturating_mul(i64::try_from(self.members.len()).unwrap_or(i64::MAX))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSol {
    pub name: String,
    pub contribution: i64,
    pub currency: String,
    pub frequency: SolFrequency,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SolUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contribution: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<SolFrequency>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Contribution {
    pub amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serde_json::json;

    #[test]
    fn receipt_accepts_wrapped_and_bare_shapes() {
        let tx = json!({
            "id": "t1",
            "account_id": "a1",
            "kind": "expense",
            "amount": 1500,
            "label": "Marché",
            "occurred_at": "2026-03-01T10:00:00Z"
        });

        let wrapped: TransactionReceipt = serde_json::from_value(json!({
            "transaction": tx,
            "account": { "id": "a1", "name": "Courant", "currency": "HTG", "balance": 8500 }
        }))
        .unwrap();
        assert_eq!(wrapped.account.unwrap().balance, 8500);

        let bare: TransactionReceipt = serde_json::from_value(tx).unwrap();
        assert_eq!(bare.transaction.id, "t1");
        assert!(bare.account.is_none());
    }

    #[test]
    fn token_response_requires_both_tokens() {
        let now = Utc::now();
        let missing = TokenResponse {
            access_token: "a".into(),
            refresh_token: String::new(),
            expires_in: Some(60),
            expires_at: None,
            user: None,
        };
        assert!(missing.into_credentials(now).is_err());

        let ok = TokenResponse {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_in: Some(60),
            expires_at: None,
            user: None,
        };
        let (pair, _) = ok.into_credentials(now).unwrap();
        assert_eq!(pair.access_token.expose_secret(), "a");
        assert_eq!(pair.access_expiry, now + Duration::seconds(60));
    }

    #[test]
    fn token_response_rejects_out_of_range_lifetime() {
        let huge = TokenResponse {
            access_token: "a".into(),
            refresh_token: "r".into(),
            expires_in: Some(i64::MAX),
            expires_at: None,
            user: None,
        };
        let err = huge.into_credentials(Utc::now()).unwrap_err();
        assert!(matches!(err, Error::Deserialization { .. }));
    }

    #[test]
    fn sol_pot_scales_with_members() {
        let member = |id: &str| SolMember {
            user_id: id.into(),
            display_name: String::new(),
            position: 0,
            has_received: false,
        };
        let sol = Sol {
            id: "s1".into(),
            name: "Famille".into(),
            contribution: 2_000,
            currency: "HTG".into(),
            frequency: SolFrequency::Monthly,
            members: vec![member("u1"), member("u2"), member("u3")],
            current_round: 1,
            status: SolStatus::Active,
        };
        assert_eq!(sol.pot(), 6_000);
    }
}
