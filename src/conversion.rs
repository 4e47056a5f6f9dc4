//! User conversion events

use crate::error::{RateError, Result};
use crate::types::{Rate, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for conversion records
pub type ConversionId = Uuid;

/// Which calculator produced the conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    /// Reference (official) rate
    Ref,
    /// Bolivar amounts
    Ves,
    /// Official vs. P2P comparison
    Vs,
    /// Canadian dollar converter
    Cad,
}

impl ConversionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversionMode::Ref => "ref",
            ConversionMode::Ves => "ves",
            ConversionMode::Vs => "vs",
            ConversionMode::Cad => "cad",
        }
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConversionMode {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ref" => Ok(ConversionMode::Ref),
            "ves" => Ok(ConversionMode::Ves),
            "vs" => Ok(ConversionMode::Vs),
            "cad" => Ok(ConversionMode::Cad),
            _ => Err(RateError::ParseError(format!("Unknown conversion mode: {}", s))),
        }
    }
}

/// Conversion as reported by the caller, before the log stamps it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConversion {
    pub mode: ConversionMode,
    pub input: f64,
    pub input_currency: String,
    pub output: f64,
    pub output_currency: String,
    pub rate: Rate,
}

impl NewConversion {
    pub fn new(
        mode: ConversionMode,
        input: f64,
        input_currency: impl Into<String>,
        output: f64,
        output_currency: impl Into<String>,
        rate: Rate,
    ) -> Self {
        Self {
            mode,
            input,
            input_currency: input_currency.into(),
            output,
            output_currency: output_currency.into(),
            rate,
        }
    }

    /// Whether the conversion is worth logging (both sides positive)
    pub fn is_loggable(&self) -> bool {
        self.input > 0.0 && self.output > 0.0
    }
}

/// One logged conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRecord {
    pub id: ConversionId,
    pub mode: ConversionMode,
    pub input: f64,
    pub input_currency: String,
    pub output: f64,
    pub output_currency: String,
    pub rate: Rate,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: Timestamp,
}

impl ConversionRecord {
    /// Stamp a conversion with a fresh id and time
    pub fn stamp(conversion: NewConversion, timestamp: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode: conversion.mode,
            input: conversion.input,
            input_currency: conversion.input_currency,
            output: conversion.output,
            output_currency: conversion.output_currency,
            rate: conversion.rate,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_mode_parse_and_display() {
        for mode in [
            ConversionMode::Ref,
            ConversionMode::Ves,
            ConversionMode::Vs,
            ConversionMode::Cad,
        ] {
            assert_eq!(mode.to_string().parse::<ConversionMode>().unwrap(), mode);
        }
        assert_eq!("VES".parse::<ConversionMode>().unwrap(), ConversionMode::Ves);
        assert!("usd".parse::<ConversionMode>().is_err());
    }

    #[test]
    fn test_stamp_assigns_unique_ids() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let conversion = NewConversion::new(ConversionMode::Ref, 10.0, "USD", 365.0, "VES", 36.5);

        let a = ConversionRecord::stamp(conversion.clone(), ts);
        let b = ConversionRecord::stamp(conversion, ts);
        assert_ne!(a.id, b.id);
        assert_eq!(a.timestamp, ts);
    }

    #[test]
    fn test_record_json_layout() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let record = ConversionRecord::stamp(
            NewConversion::new(ConversionMode::Cad, 100.0, "CAD", 73.5, "USD", 0.735),
            ts,
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["mode"], "cad");
        assert_eq!(json["inputCurrency"], "CAD");
        assert_eq!(json["timestamp"], ts.timestamp_millis());
    }

    #[test]
    fn test_is_loggable() {
        let ok = NewConversion::new(ConversionMode::Ves, 100.0, "VES", 2.7, "USD", 36.5);
        let zero = NewConversion::new(ConversionMode::Ves, 0.0, "VES", 0.0, "USD", 36.5);
        assert!(ok.is_loggable());
        assert!(!zero.is_loggable());
    }
}
