//! Key/value persistence for settings that must survive a restart.
//!
//! The mission core reads and writes a handful of string-valued keys; the
//! backing store is a trait so tests run on a plain map while the device
//! uses a JSON file on flash.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Location report interval, seconds.
pub const KEY_LOC_SEND: &str = "LOC_SEND";
/// Satellite-visibility watchdog window, seconds.
pub const KEY_SAT_VIEW: &str = "SAT_VIEW";
/// Sleep policy between reports: "light", "deep" or "off".
pub const KEY_SLEEPMODE: &str = "SLEEPMODE";
/// Which application boots next.
pub const KEY_APP: &str = "APP";
/// Operating mode handed to the next boot.
pub const KEY_MODE: &str = "MODE";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// String-keyed settings store.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;

    /// `get` parsed as an integer; missing and unparsable both fall back.
    fn get_u64(&self, key: &str, fallback: u64) -> u64 {
        self.get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(fallback)
    }
}

/// Volatile store for tests and simulation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }
}

/// JSON-file-backed store. Every put writes through; a corrupt or missing
/// file opens as empty rather than refusing to boot.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

#[derive(Serialize, Deserialize, Default)]
struct StoreFile {
    values: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open(path: &Path) -> Self {
        let values = match fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<StoreFile>(&text) {
                Ok(file) => file.values,
                Err(err) => {
                    warn!(%err, path = %path.display(), "settings file corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self {
            path: path.to_path_buf(),
            values,
        }
    }

    fn flush(&self) -> Result<(), StorageError> {
        let file = StoreFile {
            values: self.values.clone(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}
