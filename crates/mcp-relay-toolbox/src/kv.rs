//! Shared key/value store with an optional JSON snapshot file.
//!
//! A single `KvStore` is built at startup and handed to every tool that needs
//! it. Concurrent invocations synchronize through the store's own lock.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::io::Write;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;

use crate::types::{ToolboxError, ToolboxResult};

/// Maximum key length in bytes.
pub const MAX_KEY_LEN: usize = 256;

/// Thread-safe string → JSON map.
#[derive(Debug, Default)]
pub struct KvStore {
    entries: RwLock<BTreeMap<String, Value>>,
    snapshot: Option<PathBuf>,
    save_lock: Mutex<()>,
}

impl KvStore {
    /// Create an empty, memory-only store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by a snapshot file.
    ///
    /// A missing file yields an empty store; the file is created on first `save`.
    pub fn open(path: &Path) -> ToolboxResult<Self> {
        let entries = if path.exists() {
            let raw = std::fs::read(path)?;
            if raw.is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_slice(&raw).map_err(|e| {
                    ToolboxError::Snapshot(format!("Failed to read {}: {e}", path.display()))
                })?
            }
        } else {
            BTreeMap::new()
        };

        tracing::info!(
            "Opened key/value snapshot {} ({} entries)",
            path.display(),
            entries.len()
        );

        Ok(Self {
            entries: RwLock::new(entries),
            snapshot: Some(path.to_path_buf()),
            save_lock: Mutex::new(()),
        })
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    /// Insert `value` under `key`, returning the previous value.
    pub fn set(&self, key: &str, value: Value) -> ToolboxResult<Option<Value>> {
        validate_key(key)?;
        Ok(self.write().insert(key.to_string(), value))
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Write the snapshot file, if one is configured.
    ///
    /// Saves are serialized, so the file always holds the newest snapshot
    /// taken by any caller.
    pub fn save(&self) -> ToolboxResult<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let _saving = self.save_lock.lock().unwrap_or_else(|e| e.into_inner());

        let payload = serde_json::to_vec_pretty(&*self.read())
            .map_err(|e| ToolboxError::Snapshot(format!("Serialization failed: {e}")))?;

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        // Write then rename so a crash never leaves a truncated snapshot.
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(&payload)?;
        tmp.persist(path).map_err(|e| e.error)?;

        tracing::debug!("Saved key/value snapshot: {}", path.display());
        Ok(())
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot.as_deref()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Value>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Value>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn validate_key(key: &str) -> ToolboxResult<()> {
    if key.is_empty() {
        return Err(ToolboxError::InvalidKey("key must not be empty".to_string()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(ToolboxError::InvalidKey(format!(
            "key is {} bytes, limit is {MAX_KEY_LEN}",
            key.len()
        )));
    }
    Ok(())
}
