//! JSON file persistence for the session record.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{WalletError, WalletResult};
use crate::storage::{PersistedSession, SessionStore};

/// Stores the session record as a JSON document at a fixed path.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> WalletResult<Option<PersistedSession>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_error("open", &self.path, e)),
        };

        let record: PersistedSession = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| storage_error("parse", &self.path, e))?;
        tracing::debug!(path = %self.path.display(), connector = %record.connector_id, "Loaded persisted session");
        Ok(Some(record))
    }

    fn save(&self, record: &PersistedSession) -> WalletResult<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| storage_error("create directory for", &self.path, e))?;
        }

        // Write then rename so a crash never leaves a half-written record.
        let temp = self.temp_path();
        let file = File::create(&temp).map_err(|e| storage_error("create", &temp, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, record).map_err(|e| storage_error("encode", &temp, e))?;
        writer.flush().map_err(|e| storage_error("flush", &temp, e))?;
        fs::rename(&temp, &self.path).map_err(|e| storage_error("rename", &self.path, e))?;

        tracing::debug!(path = %self.path.display(), "Saved session record");
        Ok(())
    }

    fn clear(&self) -> WalletResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Cleared session record");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error("remove", &self.path, e)),
        }
    }
}

fn storage_error(action: &str, path: &Path, err: impl std::fmt::Display) -> WalletError {
    WalletError::Storage(format!("failed to {} {}: {}", action, path.display(), err))
}
