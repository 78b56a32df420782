// ── Operation status records ──
//
// One record per operation kind per store, overwritten by every new
// attempt. A version counter lets consumers wait for status changes.

use std::fmt;

use dashmap::DashMap;
use strum::{Display, EnumString, IntoStaticStr};
use tokio::sync::watch;

/// Name plus the default success message of a store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationKind {
    name: &'static str,
    success: &'static str,
}

impl OperationKind {
    pub const fn new(name: &'static str, success: &'static str) -> Self {
        Self { name, success }
    }

    pub const FETCH: Self = Self::new("fetch", "Loaded");
    pub const FETCH_ONE: Self = Self::new("fetch_one", "Loaded");
    pub const CREATE: Self = Self::new("create", "Created");
    pub const UPDATE: Self = Self::new("update", "Saved");
    pub const ADJUST_BALANCE: Self = Self::new("adjust_balance", "Balance adjusted");
    pub const LOGIN: Self = Self::new("login", "Signed in");
    pub const REGISTER: Self = Self::new("register", "Account created");
    pub const LOGOUT: Self = Self::new("logout", "Signed out");
    pub const FETCH_PROFILE: Self = Self::new("fetch_profile", "Profile loaded");
    pub const UPDATE_PROFILE: Self = Self::new("update_profile", "Profile updated");
    pub const JOIN: Self = Self::new("join", "Joined");
    pub const CONTRIBUTE: Self = Self::new("contribute", "Contribution recorded");

    pub fn name(self) -> &'static str {
        self.name
    }

    /// Used when neither the server nor the caller supplies a message.
    pub fn default_success_message(self) -> &'static str {
        self.success
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum OperationState {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed,
}

impl OperationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperationStatus {
    pub state: OperationState,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
}

impl OperationStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    /// Stale messages from the previous attempt are dropped.
    pub fn pending() -> Self {
        Self {
            state: OperationState::Pending,
            ..Self::default()
        }
    }

    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            state: OperationState::Succeeded,
            error_message: None,
            success_message: Some(message.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: OperationState::Failed,
            error_message: Some(message.into()),
            success_message: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == OperationState::Pending
    }
}

/// Status records of one store.
pub struct StatusBoard {
    records: DashMap<OperationKind, OperationStatus>,
    version: watch::Sender<u64>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            records: DashMap::new(),
            version,
        }
    }

    /// Idle when the kind never ran.
    pub fn get(&self, kind: OperationKind) -> OperationStatus {
        self.records
            .get(&kind)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn set(&self, kind: OperationKind, status: OperationStatus) {
        self.records.insert(kind, status);
        self.version.send_modify(|v| *v += 1);
    }

    pub fn any_pending(&self) -> bool {
        self.records.iter().any(|r| r.value().is_pending())
    }

    pub fn reset(&self) {
        self.records.clear();
        self.version.send_modify(|v| *v += 1);
    }

    /// Bumped on every status change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_is_idle() {
        let board = StatusBoard::new();
        assert_eq!(board.get(OperationKind::CREATE), OperationStatus::idle());
    }

    #[test]
    fn kinds_are_independent() {
        let board = StatusBoard::new();
        board.set(OperationKind::CREATE, OperationStatus::pending());
        board.set(OperationKind::UPDATE, OperationStatus::failed("nope"));
        assert!(board.get(OperationKind::CREATE).is_pending());
        assert_eq!(
            board.get(OperationKind::UPDATE).error_message.as_deref(),
            Some("nope")
        );
        assert!(board.any_pending());
    }

    #[test]
    fn states_render_snake_case() {
        assert_eq!(OperationState::Succeeded.to_string(), "succeeded");
        assert_eq!(
            "pending".parse::<OperationState>().ok(),
            Some(OperationState::Pending)
        );
    }
}
