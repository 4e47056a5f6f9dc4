//! Partial authoritative daily series from a remote history source
//!
//! The remote-history collaborator hands this over wholesale per request.
//! Only CAD/USD is always covered; the official USD and EUR series are present
//! only when the upstream source has them. The JSON shape is
//! `{"cadByDate": {...}, "bcvByDate": {...}, "bcvEurByDate": {...}}` with
//! `YYYY-MM-DD` keys.

use crate::calendar::DayKey;
use crate::error::{RateError, Result};
use crate::types::{Instrument, Rate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Day-keyed rates for one instrument
pub type DailySeries = BTreeMap<DayKey, Rate>;

fn is_valid_rate(value: Rate) -> bool {
    value.is_finite() && value > 0.0
}

/// External per-day observations, keyed by instrument
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalDailySeries {
    #[serde(rename = "cadByDate", default)]
    cad_usd: DailySeries,
    #[serde(rename = "bcvByDate", default, skip_serializing_if = "Option::is_none")]
    bcv_usd: Option<DailySeries>,
    #[serde(rename = "bcvEurByDate", default, skip_serializing_if = "Option::is_none")]
    bcv_eur: Option<DailySeries>,
}

impl ExternalDailySeries {
    /// Empty series covering only CAD/USD
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the remote-history JSON payload
    ///
    /// Non-positive and non-finite values are dropped, and optional series
    /// left empty count as not covered.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Self = serde_json::from_str(json)?;
        Ok(raw.sanitized())
    }

    fn sanitized(mut self) -> Self {
        self.cad_usd.retain(|_, v| is_valid_rate(*v));
        for series in [&mut self.bcv_usd, &mut self.bcv_eur] {
            if let Some(map) = series.as_mut() {
                map.retain(|_, v| is_valid_rate(*v));
            }
            if series.as_ref().map_or(false, |map| map.is_empty()) {
                *series = None;
            }
        }
        self
    }

    /// Add one observation, enabling coverage for the instrument if needed
    pub fn insert(&mut self, instrument: Instrument, day: DayKey, value: Rate) -> Result<()> {
        if !is_valid_rate(value) {
            return Err(RateError::InvalidData(format!(
                "External {} rate for {} must be positive and finite, got: {}",
                instrument, day, value
            )));
        }

        let series = match instrument {
            Instrument::CadUsd => &mut self.cad_usd,
            Instrument::BcvUsd => self.bcv_usd.get_or_insert_with(BTreeMap::new),
            Instrument::BcvEur => self.bcv_eur.get_or_insert_with(BTreeMap::new),
            Instrument::Binance => {
                return Err(RateError::InvalidData(
                    "No external history source covers the Binance rate".to_string(),
                ))
            }
        };
        series.insert(day, value);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, instrument: Instrument, day: DayKey, value: Rate) -> Result<Self> {
        self.insert(instrument, day, value)?;
        Ok(self)
    }

    /// Series for an instrument, `None` when the source does not cover it
    pub fn series(&self, instrument: Instrument) -> Option<&DailySeries> {
        match instrument {
            Instrument::CadUsd => Some(&self.cad_usd),
            Instrument::BcvUsd => self.bcv_usd.as_ref(),
            Instrument::BcvEur => self.bcv_eur.as_ref(),
            Instrument::Binance => None,
        }
    }

    pub fn covers(&self, instrument: Instrument) -> bool {
        self.series(instrument).is_some()
    }

    /// Known rate for an instrument on an exact day
    pub fn value(&self, instrument: Instrument, day: DayKey) -> Option<Rate> {
        self.series(instrument)?
            .get(&day)
            .copied()
            .filter(|v| is_valid_rate(*v))
    }

    /// Earliest day any instrument has a value for
    pub fn first_day(&self) -> Option<DayKey> {
        Instrument::ALL
            .iter()
            .filter_map(|&i| self.series(i))
            .filter_map(|series| series.keys().next().copied())
            .min()
    }

    /// Total number of observations across instruments
    pub fn len(&self) -> usize {
        Instrument::ALL
            .iter()
            .filter_map(|&i| self.series(i))
            .map(|series| series.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
