//! Per-provider cache of the latest fetched payload
//!
//! Lets a fetch collaborator skip an upstream call while the previous answer
//! is still fresh. Expired entries are deleted on read.

use super::{load_document, store_document, StorageBackend};
use crate::clock::{Clock, SystemClock};
use crate::types::Timestamp;
use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Upstream rate provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// Official central bank rates (USD and EUR)
    Bcv,
    /// Binance P2P rate
    Binance,
    /// CAD/USD pair
    Cad,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Bcv, Provider::Binance, Provider::Cad];

    /// Storage key of this provider's cache entry
    pub fn cache_key(&self) -> &'static str {
        match self {
            Provider::Bcv => "fluxcambio_bcv_cache",
            Provider::Binance => "fluxcambio_binance_cache",
            Provider::Cad => "fluxcambio_cad_cache",
        }
    }

    /// How long a cached payload stays fresh
    pub fn max_age(&self) -> Duration {
        match self {
            Provider::Bcv | Provider::Binance => Duration::minutes(20),
            Provider::Cad => Duration::minutes(60),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Bcv => "bcv",
            Provider::Binance => "binance",
            Provider::Cad => "cad",
        };
        write!(f, "{}", name)
    }
}

/// Stored cache document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry<T> {
    pub data: T,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
}

/// Time-limited payload cache over a storage backend
pub struct RateCache<B: StorageBackend> {
    backend: B,
    clock: Arc<dyn Clock>,
}

impl<B: StorageBackend> RateCache<B> {
    pub fn new(backend: B) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    pub fn with_clock(backend: B, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    /// Store a payload stamped `now`; returns whether it was persisted
    pub fn put<T: Serialize>(&mut self, provider: Provider, data: &T) -> bool {
        let entry = CachedEntry {
            data,
            timestamp: self.clock.now(),
        };
        store_document(&mut self.backend, provider.cache_key(), &entry)
    }

    /// Fresh payload for a provider
    ///
    /// Entries at least `max_age` old are removed and read as `None`, as are
    /// entries that fail to decode.
    pub fn get<T: DeserializeOwned>(&mut self, provider: Provider) -> Option<T> {
        let key = provider.cache_key();
        let entry: CachedEntry<T> = load_document(&self.backend, key)?;

        if self.clock.now() - entry.timestamp < provider.max_age() {
            return Some(entry.data);
        }

        log::debug!("Cache entry for {} expired at {}", provider, entry.timestamp);
        if let Err(e) = self.backend.remove(key) {
            log::warn!("Failed to evict expired cache entry '{}': {}", key, e);
        }
        None
    }

    /// Drop a provider's entry
    pub fn invalidate(&mut self, provider: Provider) {
        if let Err(e) = self.backend.remove(provider.cache_key()) {
            log::warn!("Failed to invalidate cache for {}: {}", provider, e);
        }
    }
}
