//! Persistent key/value settings
//!
//! Slot bindings are stored as `pad.<slot>` → `"<guid>:<name>"`. The input
//! core only sees the [`ConfigStore`] trait; the binary opens a
//! [`SledStore`], tests use [`MemoryStore`].

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// String key/value store
pub trait ConfigStore {
    /// Value for `key`, `None` if absent or unreadable
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    fn remove(&mut self, key: &str) -> Result<()>;

    /// Make previous writes durable
    fn flush(&mut self) -> Result<()>;
}

/// sled-backed store
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open (or create) the database directory
    ///
    /// # Arguments
    /// * `path` - Path to the sled database directory
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path)
            .with_context(|| format!("Failed to open sled database at: {}", path.display()))?;
        info!("💾 Opened settings database at {}", path.display());
        Ok(Self { db })
    }
}

impl ConfigStore for SledStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.db.get(key.as_bytes()) {
            Ok(Some(value)) => match String::from_utf8(value.to_vec()) {
                Ok(text) => Some(text),
                Err(_) => {
                    warn!("Setting '{}' is not valid UTF-8, ignoring", key);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read setting '{}': {}", key, e);
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .with_context(|| format!("Failed to persist setting '{}'", key))?;
        debug!("Stored {} = {}", key, value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .with_context(|| format!("Failed to remove setting '{}'", key))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.db.flush().context("Failed to flush settings database")?;
        Ok(())
    }
}

/// In-memory store that counts writes
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set`/`remove` calls so far
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        self.writes += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_counts_writes() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("pad.0"), None);
        store.set("pad.0", "abcd:Pad").unwrap();
        store.remove("pad.1").unwrap();
        assert_eq!(store.get("pad.0").as_deref(), Some("abcd:Pad"));
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_sled_store_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("settings.sled");

        {
            let mut store = SledStore::open(&path).unwrap();
            store.set("pad.0", "0300abcd:Retro Pad").unwrap();
            store.set("pad.1", "ffff:Other").unwrap();
            store.remove("pad.1").unwrap();
            store.flush().unwrap();
        }

        let store = SledStore::open(&path).unwrap();
        assert_eq!(store.get("pad.0").as_deref(), Some("0300abcd:Retro Pad"));
        assert_eq!(store.get("pad.1"), None);
    }
}
