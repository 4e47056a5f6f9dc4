//! Conversion history log: newest-first, size-bounded

use super::{load_document, store_document, StorageBackend, CONVERSION_HISTORY_KEY};
use crate::clock::{Clock, SystemClock};
use crate::config::{RatekeeperConfig, DEFAULT_CONVERSION_HISTORY_CAPACITY};
use crate::conversion::{ConversionRecord, NewConversion};
use std::collections::VecDeque;
use std::sync::Arc;

/// Log of user conversions
///
/// Every call to [`append`](ConversionLog::append) is admitted; debouncing is
/// the caller's job.
pub struct ConversionLog<B: StorageBackend> {
    backend: B,
    clock: Arc<dyn Clock>,
    capacity: usize,
    records: VecDeque<ConversionRecord>,
}

impl<B: StorageBackend> ConversionLog<B> {
    /// Open with the default capacity (50)
    pub fn open(backend: B) -> Self {
        Self::with_settings(
            backend,
            Arc::new(SystemClock),
            DEFAULT_CONVERSION_HISTORY_CAPACITY,
        )
    }

    pub fn from_config(backend: B, clock: Arc<dyn Clock>, config: &RatekeeperConfig) -> Self {
        Self::with_settings(backend, clock, config.conversion_history_capacity)
    }

    /// Open with an explicit capacity; zero is treated as one
    pub fn with_settings(backend: B, clock: Arc<dyn Clock>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut records: VecDeque<ConversionRecord> =
            load_document::<B, Vec<ConversionRecord>>(&backend, CONVERSION_HISTORY_KEY)
                .unwrap_or_default()
                .into();
        records.truncate(capacity);

        Self {
            backend,
            clock,
            capacity,
            records,
        }
    }

    /// Stamp and prepend a conversion, dropping the oldest beyond capacity
    pub fn append(&mut self, conversion: NewConversion) -> &ConversionRecord {
        let record = ConversionRecord::stamp(conversion, self.clock.now());
        log::debug!("Logging {} conversion {}", record.mode, record.id);

        self.records.push_front(record);
        self.records.truncate(self.capacity);
        store_document(&mut self.backend, CONVERSION_HISTORY_KEY, &self.records);

        &self.records[0]
    }

    /// Every record, newest first
    pub fn read_all(&self) -> Vec<ConversionRecord> {
        self.records.iter().cloned().collect()
    }

    /// Remove every record
    pub fn clear(&mut self) {
        self.records.clear();
        if let Err(e) = self.backend.remove(CONVERSION_HISTORY_KEY) {
            log::warn!("Failed to clear conversion history: {}", e);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
