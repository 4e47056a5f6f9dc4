//! Persistent side-store for the bounded logs
//!
//! # Components
//!
//! - **backend**: `StorageBackend` trait and the in-memory backend
//! - **file**: one JSON document per key in a directory
//! - **sqlite**: key/value table in a SQLite database
//! - **observation_log**: throttled, size-bounded log of rate samples
//! - **conversion_log**: newest-first, size-bounded log of user conversions
//! - **cache**: per-provider cache of the latest fetched payload
//!
//! Collections are stored as JSON documents under namespaced keys. A failing
//! or corrupt store degrades to "less data", never to an error for callers of
//! the logs.

pub mod backend;
pub mod cache;
pub mod conversion_log;
pub mod file;
pub mod observation_log;
#[cfg(feature = "rusqlite-support")]
pub mod sqlite;

pub use backend::{MemoryBackend, StorageBackend};
pub use cache::{CachedEntry, Provider, RateCache};
pub use conversion_log::ConversionLog;
pub use file::FileBackend;
pub use observation_log::ObservationLog;
#[cfg(feature = "rusqlite-support")]
pub use sqlite::SqliteBackend;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Storage key of the observation log
pub const RATE_HISTORY_KEY: &str = "fluxcambio_rate_history";

/// Storage key of the conversion history log
pub const CONVERSION_HISTORY_KEY: &str = "fluxcambio_history";

/// Read and decode a JSON document, treating every failure as "no data"
pub(crate) fn load_document<B, T>(backend: &B, key: &str) -> Option<T>
where
    B: StorageBackend + ?Sized,
    T: DeserializeOwned,
{
    let raw = match backend.load(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            log::warn!("Failed to read '{}' from storage: {}", key, e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Ignoring malformed data under '{}': {}", key, e);
            None
        }
    }
}

/// Encode and write a JSON document; failures are logged and reported as `false`
pub(crate) fn store_document<B, T>(backend: &mut B, key: &str, value: &T) -> bool
where
    B: StorageBackend + ?Sized,
    T: Serialize + ?Sized,
{
    let encoded = match serde_json::to_string(value) {
        Ok(encoded) => encoded,
        Err(e) => {
            log::warn!("Failed to encode '{}': {}", key, e);
            return false;
        }
    };

    match backend.store(key, &encoded) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Failed to persist '{}': {}", key, e);
            false
        }
    }
}
