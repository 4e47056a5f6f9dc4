//! Storage backend trait and in-memory implementation

use crate::error::{RateError, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Durable key/value side-store
///
/// Values are opaque strings (JSON documents in practice).
pub trait StorageBackend: Send {
    /// Read the value under `key`, `None` when absent
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value
    fn store(&mut self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`; removing an absent key succeeds
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn load(&self, key: &str) -> Result<Option<String>> {
        (**self).load(key)
    }

    fn store(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).store(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Process-local backend
///
/// Clones share the same map, so a second store opened on a clone sees what
/// the first one persisted (as after a restart).
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values.read().map(|values| values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|e| RateError::StorageError(format!("Memory store poisoned: {}", e)))?;
        Ok(values.get(key).cloned())
    }

    fn store(&mut self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| RateError::StorageError(format!("Memory store poisoned: {}", e)))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| RateError::StorageError(format!("Memory store poisoned: {}", e)))?;
        values.remove(key);
        Ok(())
    }
}
