// ── Notification queue & scheduler ──
//
// Each notification with a finite duration gets its own timer task, tied
// to a child of the queue's root cancellation token. Dismissal cancels
// the expiry timer and schedules removal after the exit delay. Timer
// tasks only hold a `Weak` handle, so dropping the last queue handle
// cancels everything.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use indexmap::IndexMap;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::model::{
    Notification, NotificationConfig, NotificationId, NotificationRequest, Phase, Position,
};
use crate::events::{LifecycleEvent, LifecycleObserver, LifecycleOutcome};

/// Notifications grouped by position, oldest first within a group.
pub type NotificationSnapshot = Arc<BTreeMap<Position, Vec<Arc<Notification>>>>;

struct Entry {
    notification: Arc<Notification>,
    /// Expiry timer while visible, removal timer while exiting.
    timer: Option<CancellationToken>,
}

struct QueueInner {
    config: NotificationConfig,
    entries: Mutex<IndexMap<NotificationId, Entry>>,
    snapshot: watch::Sender<NotificationSnapshot>,
    next_id: AtomicU64,
    shutdown: CancellationToken,
}

impl Drop for QueueInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[derive(Clone, Copy)]
enum TimerAction {
    Dismiss,
    Remove,
}

/// Cloneable handle to one notification queue.
#[derive(Clone)]
pub struct NotificationQueue {
    inner: Arc<QueueInner>,
}

impl std::fmt::Debug for NotificationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationQueue")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(NotificationConfig::default())
    }
}

impl NotificationQueue {
    pub fn new(config: NotificationConfig) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(BTreeMap::new()));
        Self {
            inner: Arc::new(QueueInner {
                config,
                entries: Mutex::new(IndexMap::new()),
                snapshot,
                next_id: AtomicU64::new(1),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn config(&self) -> &NotificationConfig {
        &self.inner.config
    }

    /// Show a notification at the tail of its position group.
    pub fn push(&self, request: NotificationRequest) -> NotificationId {
        let config = &self.inner.config;
        let id = NotificationId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let duration = request
            .duration
            .unwrap_or_else(|| config.duration_for(request.kind));
        let notification = Notification {
            id,
            kind: request.kind,
            title: request.title,
            message: request.message,
            position: request.position.unwrap_or(config.default_position),
            created_at: Utc::now(),
            duration,
            auto_expire: request.auto_expire,
            phase: Phase::Visible,
        };
        let position = notification.position;
        let timer = notification
            .expires()
            .then(|| self.inner.shutdown.child_token());

        let overflow: Vec<NotificationId> = {
            let mut entries = self.lock();
            entries.insert(
                id,
                Entry {
                    notification: Arc::new(notification),
                    timer: timer.clone(),
                },
            );
            let visible: Vec<NotificationId> = entries
                .values()
                .filter(|e| e.notification.position == position && e.notification.is_visible())
                .map(|e| e.notification.id)
                .collect();
            let excess = visible.len().saturating_sub(config.max_visible);
            visible.into_iter().take(excess).collect()
        };
        debug!(%id, %position, ?duration, "notification pushed");

        if let Some(token) = timer {
            self.schedule(id, duration, token, TimerAction::Dismiss);
        }
        for old in overflow {
            trace!(id = %old, "dismissing overflow notification");
            self.dismiss(old);
        }
        self.publish();
        id
    }

    /// Start the exit of a visible notification. Returns `false` when it
    /// is unknown or already exiting.
    pub fn dismiss(&self, id: NotificationId) -> bool {
        let exit_delay = self.inner.config.exit_delay;
        let token = {
            let mut entries = self.lock();
            let Some(entry) = entries.get_mut(&id) else {
                return false;
            };
            if !entry.notification.is_visible() {
                return false;
            }
            if let Some(expiry) = entry.timer.take() {
                expiry.cancel();
            }
            let mut exiting = (*entry.notification).clone();
            exiting.phase = Phase::Exiting;
            entry.notification = Arc::new(exiting);

            let token = self.inner.shutdown.child_token();
            entry.timer = Some(token.clone());
            token
        };
        debug!(%id, "notification dismissed");

        if exit_delay.is_zero() || !self.schedule(id, exit_delay, token, TimerAction::Remove) {
            self.remove(id);
            return true;
        }
        self.publish();
        true
    }

    /// Dismiss every visible notification.
    pub fn clear(&self) {
        let ids: Vec<NotificationId> = self
            .lock()
            .values()
            .filter(|e| e.notification.is_visible())
            .map(|e| e.notification.id)
            .collect();
        for id in ids {
            self.dismiss(id);
        }
    }

    pub fn get(&self, id: NotificationId) -> Option<Arc<Notification>> {
        self.lock().get(&id).map(|e| Arc::clone(&e.notification))
    }

    /// Visible notifications across all positions, oldest first.
    pub fn visible(&self) -> Vec<Arc<Notification>> {
        self.lock()
            .values()
            .filter(|e| e.notification.is_visible())
            .map(|e| Arc::clone(&e.notification))
            .collect()
    }

    /// Visible and exiting notifications.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Everything still on screen, grouped by position. Entries in
    /// [`Phase::Exiting`] are playing their exit and are gone once the
    /// exit delay passes; use [`visible`](Self::visible) for only the
    /// live ones.
    pub fn snapshot(&self) -> NotificationSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Change feed of [`snapshot`](Self::snapshot).
    pub fn subscribe(&self) -> watch::Receiver<NotificationSnapshot> {
        self.inner.snapshot.subscribe()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn lock(&self) -> std::sync::MutexGuard<'_, IndexMap<NotificationId, Entry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, id: NotificationId) {
        if self.lock().shift_remove(&id).is_some() {
            trace!(%id, "notification removed");
            self.publish();
        }
    }

    /// Snapshot and send under the entries lock, so snapshots reach
    /// subscribers in the order the entries changed.
    fn publish(&self) {
        let entries = self.lock();
        let mut grouped: BTreeMap<Position, Vec<Arc<Notification>>> = BTreeMap::new();
        for entry in entries.values() {
            grouped
                .entry(entry.notification.position)
                .or_default()
                .push(Arc::clone(&entry.notification));
        }
        self.inner.snapshot.send_replace(Arc::new(grouped));
        drop(entries);
    }

    /// Run `action` after `delay` unless `token` is cancelled first.
    /// Returns `false` outside a tokio runtime.
    fn schedule(
        &self,
        id: NotificationId,
        delay: Duration,
        token: CancellationToken,
        action: TimerAction,
    ) -> bool {
        let Ok(handle) = Handle::try_current() else {
            debug!(%id, "no async runtime, notification timer not started");
            return false;
        };
        let deadline = Instant::now() + delay;
        let queue: Weak<QueueInner> = Arc::downgrade(&self.inner);
        handle.spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep_until(deadline) => {
                    if let Some(inner) = queue.upgrade() {
                        let queue = NotificationQueue { inner };
                        match action {
                            TimerAction::Dismiss => {
                                queue.dismiss(id);
                            }
                            TimerAction::Remove => queue.remove(id),
                        }
                    }
                }
            }
        });
        true
    }
}

// ── Lifecycle bridge ─────────────────────────────────────────────────

impl LifecycleObserver for NotificationQueue {
    fn on_event(&self, event: &LifecycleEvent) {
        match event.outcome {
            LifecycleOutcome::Succeeded if event.silent => {}
            LifecycleOutcome::Succeeded => {
                self.push(NotificationRequest::success(event.message.clone()));
            }
            LifecycleOutcome::Failed => {
                self.push(NotificationRequest::error(event.message.clone()));
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::notify::NotificationKind;
    use crate::store::OperationKind;

    fn queue() -> NotificationQueue {
        NotificationQueue::new(NotificationConfig::default())
    }

    async fn at(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn expires_after_its_duration() {
        let queue = queue();
        let id = queue.push(NotificationRequest::error("Payment failed"));

        at(4999).await;
        assert!(queue.get(id).unwrap().is_visible());

        at(2).await;
        assert_eq!(queue.get(id).unwrap().phase, Phase::Exiting);

        at(301).await;
        assert!(queue.get(id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_exit_phase_then_removal() {
        let queue = queue();
        let mut rx = queue.subscribe();
        let id = queue.push(NotificationRequest::error("Payment failed"));
        let phase_of = |snapshot: &NotificationSnapshot| {
            snapshot
                .get(&Position::TopRight)
                .and_then(|group| group.iter().find(|n| n.id == id))
                .map(|n| n.phase)
        };

        at(4999).await;
        assert_eq!(phase_of(&*rx.borrow_and_update()), Some(Phase::Visible));

        at(2).await;
        assert!(rx.has_changed().unwrap());
        assert_eq!(phase_of(&*rx.borrow_and_update()), Some(Phase::Exiting));
        assert!(queue.visible().is_empty());

        at(300).await;
        assert_eq!(phase_of(&*rx.borrow_and_update()), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_changes_publish_the_latest_entries() {
        let queue = NotificationQueue::new(NotificationConfig {
            exit_delay: Duration::from_secs(60),
            ..NotificationConfig::default()
        });
        let rx = queue.subscribe();
        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let queue = queue.clone();
                tokio::spawn(async move {
                    let id = queue.push(NotificationRequest::info(format!("n{i}")).sticky());
                    if i % 2 == 0 {
                        queue.dismiss(id);
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let published: usize = rx.borrow().values().map(Vec::len).sum();
        assert_eq!(published, queue.len());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_persists_until_dismissed() {
        let queue = queue();
        let id = queue.push(NotificationRequest::success("Saved").duration(Duration::ZERO));

        at(60_000).await;
        assert!(queue.get(id).unwrap().is_visible());

        assert!(queue.dismiss(id));
        at(301).await;
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sticky_ignores_duration() {
        let queue = queue();
        let id = queue.push(NotificationRequest::info("Offline mode").sticky());
        at(10_000).await;
        assert!(queue.get(id).unwrap().is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn dismiss_is_idempotent() {
        let queue = queue();
        let id = queue.push(NotificationRequest::info("Hello"));

        assert!(queue.dismiss(id));
        let after_first = queue.snapshot();
        assert!(!queue.dismiss(id));
        assert_eq!(queue.snapshot(), after_first);

        at(301).await;
        assert!(!queue.dismiss(id));
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timers_are_independent() {
        let queue = queue();
        let short = queue.push(NotificationRequest::info("short").duration(Duration::from_secs(1)));
        let long = queue.push(NotificationRequest::info("long").duration(Duration::from_secs(3)));

        queue.dismiss(short);
        at(1500).await;
        assert!(queue.get(short).is_none());
        assert!(queue.get(long).unwrap().is_visible());

        at(1600).await;
        assert_eq!(queue.get(long).unwrap().phase, Phase::Exiting);
    }

    #[tokio::test(start_paused = true)]
    async fn overflow_dismisses_oldest_in_same_position() {
        let config = NotificationConfig {
            max_visible: 2,
            ..NotificationConfig::default()
        };
        let queue = NotificationQueue::new(config);
        let first = queue.push(NotificationRequest::info("1"));
        let other_corner =
            queue.push(NotificationRequest::info("elsewhere").position(Position::BottomLeft));
        let second = queue.push(NotificationRequest::info("2"));
        let third = queue.push(NotificationRequest::info("3"));

        assert_eq!(queue.get(first).unwrap().phase, Phase::Exiting);
        for id in [other_corner, second, third] {
            assert!(queue.get(id).unwrap().is_visible());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_groups_by_position_in_insertion_order() {
        let queue = queue();
        let a = queue.push(NotificationRequest::info("a"));
        let b = queue.push(NotificationRequest::info("b").position(Position::BottomCenter));
        let c = queue.push(NotificationRequest::info("c"));

        let snapshot = queue.snapshot();
        let top: Vec<NotificationId> = snapshot[&Position::TopRight].iter().map(|n| n.id).collect();
        assert_eq!(top, vec![a, c]);
        assert_eq!(snapshot[&Position::BottomCenter][0].id, b);
        assert!(a < b && b < c);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_dismisses_everything() {
        let queue = queue();
        queue.push(NotificationRequest::info("a").sticky());
        queue.push(NotificationRequest::warning("b"));
        queue.clear();
        assert!(queue.visible().is_empty());
        at(301).await;
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_queue_cancels_timers() {
        let queue = queue();
        let mut rx = queue.subscribe();
        queue.push(NotificationRequest::info("bye"));
        rx.borrow_and_update();
        drop(queue);
        at(5000).await;
        // timers only hold weak handles, so the queue is really gone
        assert!(rx.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_events_become_notifications() {
        let queue = queue();
        queue.on_event(&LifecycleEvent::succeeded(
            "accounts",
            OperationKind::FETCH,
            "Loaded",
            true,
        ));
        assert!(queue.is_empty());

        queue.on_event(&LifecycleEvent::failed(
            "accounts",
            OperationKind::CREATE,
            "Name is required",
        ));
        let visible = queue.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].kind, NotificationKind::Error);
        assert_eq!(visible[0].message, "Name is required");
    }

    #[test]
    fn works_without_runtime() {
        let queue = queue();
        let id = queue.push(NotificationRequest::success("no timers"));
        assert!(queue.get(id).unwrap().is_visible());
        assert!(queue.dismiss(id));
        assert!(queue.get(id).is_none());
    }
}
