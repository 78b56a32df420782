// ── Transient notifications ──
//
// Position-aware queue of time-bounded messages, fed by lifecycle events
// and rendered by whatever front end owns the `AppContext`.

mod model;
mod queue;

pub use model::{
    Notification, NotificationConfig, NotificationId, NotificationKind, NotificationRequest,
    Phase, Position,
};
pub use queue::{NotificationQueue, NotificationSnapshot};
