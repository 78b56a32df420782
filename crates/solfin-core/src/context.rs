// ── Application context ──
//
// Builds the whole client stack once: session store, API client, domain
// stores, lifecycle bus and notification queue. Front ends create one
// context at start and pass it by reference; tests build fresh ones.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use solfin_api::{ApiClient, HttpTransport, SessionStorage, SessionStore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::domain::{AccountStore, AuthStore, BudgetStore, SolStore, TransactionStore};
use crate::error::CoreError;
use crate::events::LifecycleBus;
use crate::model::{NewTransaction, TransactionReceipt, TransactionUpdate};
use crate::notify::NotificationQueue;

/// Cheaply cloneable handle to the client stack.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    config: ClientConfig,
    api: ApiClient,
    bus: Arc<LifecycleBus>,
    notifications: NotificationQueue,
    auth: AuthStore,
    accounts: AccountStore,
    transactions: TransactionStore,
    budgets: BudgetStore,
    sols: SolStore,
    cancel: CancellationToken,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl AppContext {
    /// Build the stack and restore any persisted session.
    pub fn new(config: ClientConfig, storage: Arc<dyn SessionStorage>) -> Result<Self, CoreError> {
        let session = Arc::new(SessionStore::new(storage));
        if session.hydrate() {
            debug!("resuming persisted session");
        }
        let transport = HttpTransport::new(&config.transport())?;
        let api = ApiClient::with_refresh_timeout(transport, session, config.refresh_timeout);
        Ok(Self::with_api(config, api))
    }

    /// Build around an existing client (custom transports, tests).
    pub fn with_api(config: ClientConfig, api: ApiClient) -> Self {
        let bus = Arc::new(LifecycleBus::new());
        let notifications = NotificationQueue::new(config.notifications.clone());
        bus.subscribe(Arc::new(notifications.clone()));

        Self {
            inner: Arc::new(ContextInner {
                auth: AuthStore::new(api.clone(), Arc::clone(&bus)),
                accounts: AccountStore::new(api.clone(), Arc::clone(&bus)),
                transactions: TransactionStore::new(api.clone(), Arc::clone(&bus)),
                budgets: BudgetStore::new(api.clone(), Arc::clone(&bus)),
                sols: SolStore::new(api.clone(), Arc::clone(&bus)),
                config,
                api,
                bus,
                notifications,
                cancel: CancellationToken::new(),
                watcher: Mutex::new(None),
            }),
        }
    }

    /// Start the background task that resets every store when the
    /// session ends (sign-out or failed refresh). Idempotent; needs a
    /// tokio runtime.
    pub fn start(&self) {
        let mut watcher = self
            .inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if watcher.is_some() {
            return;
        }
        let context = Arc::downgrade(&self.inner);
        let cancel = self.inner.cancel.child_token();
        let changes = self.inner.api.session().subscribe();
        *watcher = Some(tokio::spawn(session_watch_task(context, changes, cancel)));
    }

    /// Stop background tasks. Stores keep their data.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self
            .inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.inner.api.session()
    }

    pub fn bus(&self) -> &Arc<LifecycleBus> {
        &self.inner.bus
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.inner.notifications
    }

    pub fn auth(&self) -> &AuthStore {
        &self.inner.auth
    }

    pub fn accounts(&self) -> &AccountStore {
        &self.inner.accounts
    }

    pub fn transactions(&self) -> &TransactionStore {
        &self.inner.transactions
    }

    pub fn budgets(&self) -> &BudgetStore {
        &self.inner.budgets
    }

    pub fn sols(&self) -> &SolStore {
        &self.inner.sols
    }

    // ── Cross-domain operations ──────────────────────────────────────

    /// Create a transaction and apply the account the server returned
    /// with it.
    pub async fn record_transaction(
        &self,
        transaction: NewTransaction,
    ) -> Result<TransactionReceipt, CoreError> {
        let epoch = self.inner.accounts.epoch();
        let receipt = self.inner.transactions.create(transaction).await?;
        self.forward_account(&receipt, epoch);
        Ok(receipt)
    }

    pub async fn update_transaction(
        &self,
        id: &str,
        update: TransactionUpdate,
    ) -> Result<TransactionReceipt, CoreError> {
        let epoch = self.inner.accounts.epoch();
        let receipt = self.inner.transactions.update(id, update).await?;
        self.forward_account(&receipt, epoch);
        Ok(receipt)
    }

    /// Sign out and drop all cached domain data.
    pub async fn logout(&self) -> Result<(), CoreError> {
        self.inner.auth.logout().await?;
        self.reset_stores();
        Ok(())
    }

    pub fn reset_stores(&self) {
        self.inner.reset_stores();
    }

    /// Skipped when the account store was reset while the transaction
    /// was in flight.
    fn forward_account(&self, receipt: &TransactionReceipt, epoch: u64) {
        if self.inner.accounts.epoch() != epoch {
            debug!("account store reset during transaction, not forwarding account");
            return;
        }
        if let Some(account) = &receipt.account {
            debug!(account = %account.id, "forwarding account from transaction receipt");
            self.inner.accounts.absorb(account.clone());
        }
    }
}

impl ContextInner {
    fn reset_stores(&self) {
        self.auth.reset();
        self.accounts.reset();
        self.transactions.reset();
        self.budgets.reset();
        self.sols.reset();
    }
}

async fn session_watch_task(
    context: Weak<ContextInner>,
    mut changes: tokio::sync::watch::Receiver<Arc<solfin_api::SessionState>>,
    cancel: CancellationToken,
) {
    // Counted rather than compared: a sign-out followed by a new sign-in
    // may reach this task as a single change.
    let mut ended = changes.borrow_and_update().ended;
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let now_ended = changes.borrow_and_update().ended;
                if now_ended != ended {
                    let Some(context) = context.upgrade() else {
                        break;
                    };
                    info!("session ended, clearing cached data");
                    context.reset_stores();
                }
                ended = now_ended;
            }
        }
    }
    debug!("session watch task stopped");
}
