//! Time sources for the log stores

use crate::types::Timestamp;
use chrono::{Duration, Utc};
use std::sync::{Arc, RwLock};

/// Source of "now" for admission and record stamping
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Settable clock for tests and replays
///
/// Clones share the same instant, so a test can keep a handle and advance
/// time under a store that owns another clone.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    /// Jump to an instant
    pub fn set(&self, ts: Timestamp) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now = ts;
    }

    /// Move forward by `by`
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}
