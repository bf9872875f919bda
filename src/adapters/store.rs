//! Key-value store adapters.
//!
//! Implements [`KeyValueStore`] twice:
//!
//! - [`MemoryStore`] — `HashMap`, lost on exit.  Tests and dry runs.
//! - [`JsonFileStore`] — a flat JSON object on disk, rewritten on every
//!   `put`.  Enough to remember the last good device across runs.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::KeyValueStore;
use crate::error::StorageError;

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    map: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed store.  A missing or unreadable file starts empty.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    map: HashMap<String, String>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let map = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!("store: {} is not valid JSON ({}), starting empty", path.display(), e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        info!("store: {} ({} keys)", path.display(), map.len());
        Self { path, map }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let text = serde_json::to_string_pretty(&self.map).map_err(|_| StorageError::IoError)?;
        fs::write(&self.path, text).map_err(|e| {
            warn!("store: write {} failed: {}", self.path.display(), e);
            StorageError::IoError
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.map.insert(key.to_string(), value.to_string());
        self.flush()
    }
}
