use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Process-unique, monotonically increasing notification id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NotificationId(pub(crate) u64);

impl NotificationId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

/// Screen corner or edge a notification is stacked at.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    TopLeft,
    TopCenter,
    #[default]
    TopRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Visible,
    /// Dismissed; removed once the exit delay elapses.
    Exiting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub title: Option<String>,
    pub message: String,
    pub position: Position,
    pub created_at: DateTime<Utc>,
    /// Zero means the notification stays until dismissed.
    pub duration: Duration,
    pub auto_expire: bool,
    pub phase: Phase,
}

impl Notification {
    pub fn is_visible(&self) -> bool {
        self.phase == Phase::Visible
    }

    pub(crate) fn expires(&self) -> bool {
        self.auto_expire && !self.duration.is_zero()
    }
}

/// What to show; unset fields fall back to [`NotificationConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub kind: NotificationKind,
    pub title: Option<String>,
    pub message: String,
    pub position: Option<Position>,
    pub duration: Option<Duration>,
    pub auto_expire: bool,
}

impl NotificationRequest {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: None,
            message: message.into(),
            position: None,
            duration: None,
            auto_expire: true,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, message)
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Never expires on its own.
    pub fn sticky(mut self) -> Self {
        self.auto_expire = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationConfig {
    /// Per position; the oldest visible entry is dismissed on overflow.
    pub max_visible: usize,
    /// Time an exiting notification stays before removal.
    pub exit_delay: Duration,
    pub default_position: Position,
    pub success_duration: Duration,
    pub error_duration: Duration,
    pub warning_duration: Duration,
    pub info_duration: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_visible: 5,
            exit_delay: Duration::from_millis(300),
            default_position: Position::TopRight,
            success_duration: Duration::from_millis(3000),
            error_duration: Duration::from_millis(5000),
            warning_duration: Duration::from_millis(4000),
            info_duration: Duration::from_millis(3000),
        }
    }
}

impl NotificationConfig {
    pub fn duration_for(&self, kind: NotificationKind) -> Duration {
        match kind {
            NotificationKind::Success => self.success_duration,
            NotificationKind::Error => self.error_duration,
            NotificationKind::Warning => self.warning_duration,
            NotificationKind::Info => self.info_duration,
        }
    }
}
