// Session store: the credential pair and the signed-in user.
//
// Readers take lock-free snapshots through `ArcSwap`; writers are
// serialized by a mutex so the generation counter and persistence stay
// consistent. Every establish or clear bumps the generation, which is
// what the refresh coordinator uses to tell whether another task already
// rotated the credentials.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::Error;
use crate::models::User;

/// Key the session is persisted under in every storage backend.
pub const SESSION_NAMESPACE: &str = "solfin.session";

/// Access credential, refresh credential and the access expiry.
#[derive(Debug, Clone)]
pub struct CredentialPair {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub access_expiry: DateTime<Utc>,
}

impl CredentialPair {
    pub fn is_access_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.access_expiry
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.expose_secret().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub credentials: CredentialPair,
    pub user: Option<User>,
}

/// Immutable snapshot published to readers.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Incremented on every establish or clear.
    pub generation: u64,
    /// Number of signed-in sessions that have been cleared.
    pub ended: u64,
    pub session: Option<Session>,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

// ── Persistence ──────────────────────────────────────────────────────

/// On-disk shape of a session. Secrets are exposed only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expiry: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl From<&Session> for PersistedSession {
    fn from(session: &Session) -> Self {
        Self {
            access_token: session.credentials.access_token.expose_secret().to_owned(),
            refresh_token: session.credentials.refresh_token.expose_secret().to_owned(),
            access_expiry: session.credentials.access_expiry,
            user: session.user.clone(),
        }
    }
}

impl From<PersistedSession> for Session {
    fn from(persisted: PersistedSession) -> Self {
        Self {
            credentials: CredentialPair {
                access_token: SecretString::from(persisted.access_token),
                refresh_token: SecretString::from(persisted.refresh_token),
                access_expiry: persisted.access_expiry,
            },
            user: persisted.user,
        }
    }
}

/// Backend that survives process restarts.
///
/// Implementations must be cheap enough to call on every credential
/// rotation; failures are logged by the store and never abort a request.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<PersistedSession>, Error>;
    fn save(&self, session: &PersistedSession) -> Result<(), Error>;
    fn clear(&self) -> Result<(), Error>;
}

/// Process-local storage (tests, `backend = "memory"`).
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<PersistedSession>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<PersistedSession>, Error> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, session: &PersistedSession) -> Result<(), Error> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// JSON file storage, one file per profile.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<PersistedSession>, Error> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::Storage(format!("{}: {e}", self.path.display()))),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| Error::Storage(format!("{}: {e}", self.path.display())))
    }

    fn save(&self, session: &PersistedSession) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("{}: {e}", parent.display())))?;
        }
        let raw = serde_json::to_string_pretty(session).map_err(|e| Error::Serialization {
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, raw)
            .map_err(|e| Error::Storage(format!("{}: {e}", self.path.display())))
    }

    fn clear(&self) -> Result<(), Error> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("{}: {e}", self.path.display()))),
        }
    }
}

// ── Store ────────────────────────────────────────────────────────────

/// Single source of truth for the current session.
pub struct SessionStore {
    state: ArcSwap<SessionState>,
    write_lock: Mutex<()>,
    changes: watch::Sender<Arc<SessionState>>,
    storage: Arc<dyn SessionStorage>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.load();
        f.debug_struct("SessionStore")
            .field("generation", &state.generation)
            .field("authenticated", &state.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let initial = Arc::new(SessionState::default());
        let (changes, _) = watch::channel(Arc::clone(&initial));
        Self {
            state: ArcSwap::new(initial),
            write_lock: Mutex::new(()),
            changes,
            storage,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Load a persisted session, if any. Unreadable storage is treated
    /// as signed out.
    pub fn hydrate(&self) -> bool {
        match self.storage.load() {
            Ok(Some(persisted)) => {
                debug!("restored persisted session");
                self.publish(Some(Session::from(persisted)), false);
                true
            }
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "could not load persisted session");
                false
            }
        }
    }

    pub fn snapshot(&self) -> Arc<SessionState> {
        self.state.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.state.load().generation
    }

    pub fn credentials(&self) -> Option<CredentialPair> {
        self.state
            .load()
            .session
            .as_ref()
            .map(|s| s.credentials.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.state.load().session.as_ref().and_then(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.load().is_authenticated()
    }

    /// Install a new credential pair. Keeps the known user when `user`
    /// is `None`.
    pub fn establish(&self, credentials: CredentialPair, user: Option<User>) -> u64 {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let user = user.or_else(|| self.user());
        self.publish_locked(Some(Session { credentials, user }), true)
    }

    /// Replace the user snapshot without touching credentials or the
    /// generation. No-op when signed out.
    pub fn set_user(&self, user: User) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.state.load_full();
        let Some(session) = current.session.as_ref() else {
            return;
        };
        let next = Arc::new(SessionState {
            generation: current.generation,
            ended: current.ended,
            session: Some(Session {
                credentials: session.credentials.clone(),
                user: Some(user),
            }),
        });
        self.persist(next.session.as_ref());
        self.swap(next);
    }

    /// Drop the session. Always bumps the generation so waiters never
    /// mistake a cleared session for a fresh one.
    pub fn clear(&self) -> u64 {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.publish_locked(None, true)
    }

    /// Change feed; the current value is marked seen.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionState>> {
        self.changes.subscribe()
    }

    fn publish(&self, session: Option<Session>, persist: bool) -> u64 {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.publish_locked(session, persist)
    }

    fn publish_locked(&self, session: Option<Session>, persist: bool) -> u64 {
        let current = self.state.load_full();
        let generation = current.generation + 1;
        let ended = current.ended + u64::from(current.is_authenticated() && session.is_none());
        if persist {
            self.persist(session.as_ref());
        }
        self.swap(Arc::new(SessionState {
            generation,
            ended,
            session,
        }));
        generation
    }

    fn persist(&self, session: Option<&Session>) {
        let result = match session {
            Some(session) => self.storage.save(&PersistedSession::from(session)),
            None => self.storage.clear(),
        };
        if let Err(e) = result {
            warn!(error = %e, "could not persist session");
        }
    }

    fn swap(&self, next: Arc<SessionState>) {
        self.state.store(Arc::clone(&next));
        self.changes.send_replace(next);
    }
}
