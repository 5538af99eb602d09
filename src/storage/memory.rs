//! In-process session storage.

use std::sync::Mutex;

use crate::error::{WalletError, WalletResult};
use crate::storage::{PersistedSession, SessionStore};

/// Keeps the record in memory. Used when no storage path is configured.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    record: Mutex<Option<PersistedSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a record already present, as if persisted by an earlier run.
    pub fn with_record(record: PersistedSession) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }

    /// Current record.
    pub fn get(&self) -> Option<PersistedSession> {
        self.record.lock().ok().and_then(|r| r.clone())
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> WalletResult<Option<PersistedSession>> {
        let guard = self.record.lock().map_err(|_| poisoned())?;
        Ok(guard.clone())
    }

    fn save(&self, record: &PersistedSession) -> WalletResult<()> {
        let mut guard = self.record.lock().map_err(|_| poisoned())?;
        *guard = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> WalletResult<()> {
        let mut guard = self.record.lock().map_err(|_| poisoned())?;
        *guard = None;
        Ok(())
    }
}

fn poisoned() -> WalletError {
    WalletError::Storage("session store mutex poisoned".to_string())
}
