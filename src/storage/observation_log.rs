//! Observation log: throttled, size-bounded record of observed rates
//!
//! A fetch collaborator calls [`ObservationLog::record`] after every
//! successful refresh. Samples are admitted at most once per
//! `min_interval`, and only the newest `capacity` samples are kept.

use super::{load_document, store_document, StorageBackend, RATE_HISTORY_KEY};
use crate::clock::{Clock, SystemClock};
use crate::config::{
    RatekeeperConfig, DEFAULT_MIN_SAMPLE_INTERVAL_MINUTES, DEFAULT_RATE_HISTORY_CAPACITY,
};
use crate::types::{RateSample, RateValues};
use chrono::Duration;
use std::collections::VecDeque;
use std::sync::Arc;

/// Append-only log of [`RateSample`]s, oldest first
pub struct ObservationLog<B: StorageBackend> {
    backend: B,
    clock: Arc<dyn Clock>,
    capacity: usize,
    min_interval: Duration,
    samples: VecDeque<RateSample>,
}

impl<B: StorageBackend> ObservationLog<B> {
    /// Open with the default capacity (2160) and interval (30 minutes)
    pub fn open(backend: B) -> Self {
        Self::with_settings(
            backend,
            Arc::new(SystemClock),
            DEFAULT_RATE_HISTORY_CAPACITY,
            Duration::minutes(DEFAULT_MIN_SAMPLE_INTERVAL_MINUTES),
        )
    }

    /// Open using the capacities in a configuration
    pub fn from_config(backend: B, clock: Arc<dyn Clock>, config: &RatekeeperConfig) -> Self {
        Self::with_settings(
            backend,
            clock,
            config.rate_history_capacity,
            config.min_sample_interval(),
        )
    }

    /// Open with explicit settings, loading whatever the backend holds
    ///
    /// Unreadable or malformed stored data opens as an empty log. A zero
    /// capacity is treated as one.
    pub fn with_settings(
        backend: B,
        clock: Arc<dyn Clock>,
        capacity: usize,
        min_interval: Duration,
    ) -> Self {
        let capacity = capacity.max(1);
        let mut samples: VecDeque<RateSample> =
            load_document::<B, Vec<RateSample>>(&backend, RATE_HISTORY_KEY)
                .unwrap_or_default()
                .into();

        while samples.len() > capacity {
            samples.pop_front();
        }

        log::debug!("Opened observation log with {} samples", samples.len());

        Self {
            backend,
            clock,
            capacity,
            min_interval,
            samples,
        }
    }

    /// Admit the latest rates as a new sample stamped `now`
    ///
    /// Returns `false` (and changes nothing) when the newest stored sample is
    /// younger than the minimum interval. Persistence failures are logged;
    /// the admitted sample stays visible to this process either way.
    pub fn record(&mut self, rates: RateValues) -> bool {
        let now = self.clock.now();

        if let Some(last) = self.samples.back() {
            if now - last.timestamp < self.min_interval {
                log::debug!(
                    "Skipping rate sample: last one recorded at {}",
                    last.timestamp
                );
                return false;
            }
        }

        self.samples.push_back(RateSample::new(now, rates.sanitized()));
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }

        store_document(&mut self.backend, RATE_HISTORY_KEY, &self.samples);
        true
    }

    /// Every stored sample in chronological order
    pub fn read_all(&self) -> Vec<RateSample> {
        self.samples.iter().copied().collect()
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<&RateSample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}
