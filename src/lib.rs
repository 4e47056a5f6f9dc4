//! # ratekeeper
//!
//! Bounded exchange-rate history and daily series reconciliation.
//!
//! ratekeeper keeps a throttled, size-bounded log of observed exchange rates
//! and merges it with partial external daily history into one gapless,
//! chronologically ordered series suitable for charting. It also keeps a small
//! log of user conversions that can be exported as CSV.
//!
//! ## Example
//!
//! ```rust
//! use ratekeeper::prelude::*;
//! use chrono::Utc;
//!
//! let mut log = ObservationLog::open(MemoryBackend::new());
//! log.record(RateValues::new(36.5, 39.8, 38.2, 0.74));
//!
//! let engine = ReconciliationEngine::utc();
//! let records = engine.reconcile(&log.read_all(), None, 7, Utc::now());
//! assert_eq!(records.len(), 1);
//! ```

pub mod calendar;
pub mod clock;
pub mod config;
pub mod conversion;
pub mod data;
pub mod error;
pub mod export;
pub mod storage;
pub mod types;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::calendar::{DayCalendar, DayKey, HistoryWindow, ZoneCalendar};
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::RatekeeperConfig;
    pub use crate::conversion::{ConversionMode, ConversionRecord, NewConversion};
    pub use crate::data::{ExternalDailySeries, ReconciliationEngine};
    pub use crate::error::{RateError, Result};
    pub use crate::export::CsvExporter;
    pub use crate::storage::{
        ConversionLog, FileBackend, MemoryBackend, ObservationLog, Provider, RateCache,
        StorageBackend,
    };
    pub use crate::types::*;
}
