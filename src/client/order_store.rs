use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::warn;

/// Key of the user-chosen habit display order.
pub const HABITS_ORDER_KEY: &str = "habitsOrder";

#[derive(Debug, Error)]
pub enum OrderStoreError {
    #[error("order store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("order store encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Local key-value storage for display orders. Each entry holds a
/// JSON-encoded list of ids. Reads never fail: a missing or unreadable entry
/// is an empty order.
pub trait OrderStore: Send + Sync {
    fn load(&self, key: &str) -> Vec<String>;
    fn save(&self, key: &str, ids: &[String]) -> Result<(), OrderStoreError>;
}

fn decode_entry(key: &str, raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("ignoring unreadable order entry {}: {}", key, e);
        Vec::new()
    })
}

/// Entries kept in one JSON file, rewritten on every save.
pub struct FileOrderStore {
    path: PathBuf,
}

impl FileOrderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, OrderStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl OrderStore for FileOrderStore {
    fn load(&self, key: &str) -> Vec<String> {
        match self.read_entries() {
            Ok(entries) => entries
                .get(key)
                .map(|raw| decode_entry(key, raw))
                .unwrap_or_default(),
            Err(e) => {
                warn!("failed to read {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    fn save(&self, key: &str, ids: &[String]) -> Result<(), OrderStoreError> {
        let mut entries = self.read_entries().unwrap_or_else(|e| {
            warn!("overwriting unreadable {}: {}", self.path.display(), e);
            BTreeMap::new()
        });
        entries.insert(key.to_string(), serde_json::to_string(ids)?);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryOrderStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a raw entry as-is, bypassing encoding.
    pub fn put_raw(&self, key: &str, raw: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), raw.to_string());
    }
}

impl OrderStore for MemoryOrderStore {
    fn load(&self, key: &str) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|raw| decode_entry(key, raw))
            .unwrap_or_default()
    }

    fn save(&self, key: &str, ids: &[String]) -> Result<(), OrderStoreError> {
        let raw = serde_json::to_string(ids)?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), raw);
        Ok(())
    }
}
