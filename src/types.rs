//! Core types and constants

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used throughout the library
pub type Timestamp = DateTime<Utc>;

/// Rate value. `0.0` is the "unknown" sentinel; real rates are always positive.
pub type Rate = f64;

/// One tracked rate field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Instrument {
    /// Official central bank USD rate (VES per USD)
    BcvUsd,
    /// Official central bank EUR rate (VES per EUR)
    BcvEur,
    /// Binance P2P USDT/VES rate
    Binance,
    /// CAD/USD pair
    CadUsd,
}

impl Instrument {
    /// Every instrument, in record field order
    pub const ALL: [Instrument; 4] = [
        Instrument::BcvUsd,
        Instrument::BcvEur,
        Instrument::Binance,
        Instrument::CadUsd,
    ];

    /// Field name used in the persisted JSON layout
    pub fn as_str(&self) -> &'static str {
        match self {
            Instrument::BcvUsd => "bcvUsd",
            Instrument::BcvEur => "bcvEur",
            Instrument::Binance => "binance",
            Instrument::CadUsd => "cadUsd",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Values for every instrument at one point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateValues {
    #[serde(default)]
    pub bcv_usd: Rate,
    #[serde(default)]
    pub bcv_eur: Rate,
    #[serde(default)]
    pub binance: Rate,
    #[serde(default)]
    pub cad_usd: Rate,
}

impl RateValues {
    /// Create a full set of values
    pub fn new(bcv_usd: Rate, bcv_eur: Rate, binance: Rate, cad_usd: Rate) -> Self {
        Self {
            bcv_usd,
            bcv_eur,
            binance,
            cad_usd,
        }
    }

    /// Read one instrument
    pub fn get(&self, instrument: Instrument) -> Rate {
        match instrument {
            Instrument::BcvUsd => self.bcv_usd,
            Instrument::BcvEur => self.bcv_eur,
            Instrument::Binance => self.binance,
            Instrument::CadUsd => self.cad_usd,
        }
    }

    /// Overwrite one instrument
    pub fn set(&mut self, instrument: Instrument, value: Rate) {
        match instrument {
            Instrument::BcvUsd => self.bcv_usd = value,
            Instrument::BcvEur => self.bcv_eur = value,
            Instrument::Binance => self.binance = value,
            Instrument::CadUsd => self.cad_usd = value,
        }
    }

    /// Builder-style setter
    pub fn with(mut self, instrument: Instrument, value: Rate) -> Self {
        self.set(instrument, value);
        self
    }

    /// True when at least one instrument holds a known (non-zero) rate
    pub fn has_any_rate(&self) -> bool {
        Instrument::ALL.iter().any(|&i| self.get(i) > 0.0)
    }

    /// Replace NaN and infinite values with the unknown sentinel
    pub fn sanitized(mut self) -> Self {
        for instrument in Instrument::ALL {
            if !self.get(instrument).is_finite() {
                self.set(instrument, 0.0);
            }
        }
        self
    }
}

/// One observed snapshot of all tracked rates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSample {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub rates: RateValues,
}

impl RateSample {
    /// Create a new sample
    pub fn new(timestamp: Timestamp, rates: RateValues) -> Self {
        Self { timestamp, rates }
    }

    /// Read one instrument
    pub fn get(&self, instrument: Instrument) -> Rate {
        self.rates.get(instrument)
    }
}

/// One reconciled calendar day, stamped at the start of that day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub rates: RateValues,
}

impl DailyRecord {
    /// Read one instrument
    pub fn get(&self, instrument: Instrument) -> Rate {
        self.rates.get(instrument)
    }
}
