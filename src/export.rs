//! CSV export of the conversion history
//!
//! Fields are comma-joined without quoting. Currency codes and modes must not
//! contain commas.

use crate::calendar::{DayCalendar, ZoneCalendar};
use crate::conversion::ConversionRecord;
use crate::error::{RateError, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs;
use std::path::Path;

/// Header row used when the caller supplies no localized one
pub const DEFAULT_CSV_HEADERS: [&str; 7] = [
    "Date",
    "Mode",
    "Input",
    "Input Currency",
    "Output",
    "Output Currency",
    "Rate",
];

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Flattens conversion records to delimited text
#[derive(Debug, Clone, Default)]
pub struct CsvExporter<C: DayCalendar = ZoneCalendar> {
    calendar: C,
}

impl<C: DayCalendar> CsvExporter<C> {
    /// Exporter rendering dates in the calendar's timezone
    pub fn new(calendar: C) -> Self {
        Self { calendar }
    }

    /// Serialize records in the order given (newest first from the log)
    ///
    /// Returns an empty string when there are no records, so callers can
    /// skip writing a file.
    pub fn serialize(
        &self,
        records: &[ConversionRecord],
        headers: Option<&[&str]>,
    ) -> Result<String> {
        if records.is_empty() {
            return Ok(String::new());
        }

        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .flexible(true)
            .from_writer(Vec::new());

        writer.write_record(headers.unwrap_or(&DEFAULT_CSV_HEADERS))?;

        let tz = self.calendar.timezone();
        for record in records {
            writer.write_record(&[
                record.timestamp.with_timezone(&tz).format(DATE_FORMAT).to_string(),
                record.mode.as_str().to_uppercase(),
                format!("{:.2}", record.input),
                record.input_currency.clone(),
                format!("{:.2}", record.output),
                record.output_currency.clone(),
                format!("{:.4}", record.rate),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| RateError::StorageError(format!("Failed to flush CSV buffer: {}", e)))?;
        let mut text = String::from_utf8(bytes)
            .map_err(|e| RateError::InvalidData(format!("CSV output is not UTF-8: {}", e)))?;

        if text.ends_with('\n') {
            text.pop();
        }
        Ok(text)
    }

    /// Serialize and write to `path`; nothing is written for an empty history
    ///
    /// Returns whether a file was written.
    pub fn export_to_file(
        &self,
        records: &[ConversionRecord],
        headers: Option<&[&str]>,
        path: &Path,
    ) -> Result<bool> {
        let text = self.serialize(records, headers)?;
        if text.is_empty() {
            log::info!("Conversion history is empty, skipping export");
            return Ok(false);
        }

        fs::write(path, text)?;
        log::info!("Exported {} conversions to {}", records.len(), path.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::{ConversionMode, NewConversion};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn record(
        mode: ConversionMode,
        input: f64,
        output: f64,
        rate: f64,
        hour: u32,
    ) -> ConversionRecord {
        ConversionRecord::stamp(
            NewConversion::new(mode, input, "USD", output, "VES", rate),
            Utc.with_ymd_and_hms(2024, 1, 15, hour, 5, 9).unwrap(),
        )
    }

    #[test]
    fn test_empty_history_is_empty_string() {
        let exporter = CsvExporter::new(ZoneCalendar::utc());
        assert_eq!(exporter.serialize(&[], None).unwrap(), "");
        let headers = ["Fecha", "Modo"];
        assert_eq!(exporter.serialize(&[], Some(&headers[..])).unwrap(), "");
    }

    #[test]
    fn test_rows_and_precision() {
        let exporter = CsvExporter::new(ZoneCalendar::utc());
        let records = vec![
            record(ConversionMode::Ref, 10.0, 365.0, 36.5, 14),
            record(ConversionMode::Vs, 2.5, 91.333, 36.53321, 9),
        ];

        let text = exporter.serialize(&records, None).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Date,Mode,Input,Input Currency,Output,Output Currency,Rate");
        assert_eq!(lines[1], "2024-01-15 14:05:09,REF,10.00,USD,365.00,VES,36.5000");
        assert_eq!(lines[2], "2024-01-15 09:05:09,VS,2.50,USD,91.33,VES,36.5332");
        assert!(!text.ends_with('\n'));
    }

    #[test]
    fn test_localized_headers_unquoted() {
        let exporter = CsvExporter::new(ZoneCalendar::utc());
        let headers = [
            "Fecha", "Modo", "Entrada", "Moneda, entrada", "Salida", "Moneda salida", "Tasa",
        ];

        let text = exporter
            .serialize(&[record(ConversionMode::Ves, 1.0, 1.0, 1.0, 0)], Some(&headers[..]))
            .unwrap();
        assert!(text.starts_with("Fecha,Modo,Entrada,Moneda, entrada,"));
    }

    #[test]
    fn test_dates_in_calendar_timezone() {
        let exporter = CsvExporter::new(ZoneCalendar::from_name("America/Caracas").unwrap());
        let text = exporter
            .serialize(&[record(ConversionMode::Cad, 1.0, 1.0, 1.0, 2)], None)
            .unwrap();

        assert!(text.lines().nth(1).unwrap().starts_with("2024-01-14 22:05:09,CAD"));
    }

    #[test]
    fn test_export_to_file_skips_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");
        let exporter = CsvExporter::new(ZoneCalendar::utc());

        assert!(!exporter.export_to_file(&[], None, &path).unwrap());
        assert!(!path.exists());

        let records = vec![record(ConversionMode::Ref, 1.0, 36.5, 36.5, 12)];
        assert!(exporter.export_to_file(&records, None, &path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }
}
