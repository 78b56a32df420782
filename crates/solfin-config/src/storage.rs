// Session storage in the platform keyring, serialized as JSON.

use solfin_api::{Error, PersistedSession, SESSION_NAMESPACE, SessionStorage};
use tracing::debug;

const SERVICE: &str = "solfin";

pub struct KeyringStorage {
    entry: keyring::Entry,
}

impl std::fmt::Debug for KeyringStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringStorage")
            .field("service", &SERVICE)
            .field("user", &SESSION_NAMESPACE)
            .finish()
    }
}

impl KeyringStorage {
    pub fn new() -> Result<Self, keyring::Error> {
        Ok(Self {
            entry: keyring::Entry::new(SERVICE, SESSION_NAMESPACE)?,
        })
    }
}

fn storage_error(err: &keyring::Error) -> Error {
    Error::Storage(format!("keyring: {err}"))
}

impl SessionStorage for KeyringStorage {
    fn load(&self) -> Result<Option<PersistedSession>, Error> {
        let raw = match self.entry.get_password() {
            Ok(raw) => raw,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(storage_error(&e)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| Error::Storage(format!("keyring entry is not a session: {e}")))
    }

    fn save(&self, session: &PersistedSession) -> Result<(), Error> {
        let raw = serde_json::to_string(session).map_err(|e| Error::Serialization {
            message: e.to_string(),
        })?;
        self.entry
            .set_password(&raw)
            .map_err(|e| storage_error(&e))?;
        debug!("session saved to keyring");
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(storage_error(&e)),
        }
    }
}
