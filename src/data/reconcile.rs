//! Reconciliation of local samples with an external daily series
//!
//! Produces one [`DailyRecord`] per calendar day of the requested window:
//!
//! 1. the external series wins for any day and instrument it covers,
//! 2. otherwise the latest local sample of that day, or failing that the most
//!    recent sample from an earlier day,
//! 3. otherwise the last known value carried forward from earlier days.
//!
//! Values are never taken from samples dated after the day being resolved,
//! and gaps are flat-lined rather than interpolated. Days that end up with no
//! known rate at all are left out of the result.

use super::external::ExternalDailySeries;
use crate::calendar::{DayCalendar, DayKey, HistoryWindow, ZoneCalendar};
use crate::types::{DailyRecord, Instrument, RateSample, RateValues, Timestamp};
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;

/// Merges the observation log with external history, day by day
#[derive(Debug, Clone)]
pub struct ReconciliationEngine<C: DayCalendar = ZoneCalendar> {
    calendar: C,
    authoritative: Instrument,
}

impl<C: DayCalendar> ReconciliationEngine<C> {
    /// Engine bucketing days in `calendar`, with CAD/USD as the authoritative field
    pub fn new(calendar: C) -> Self {
        Self {
            calendar,
            authoritative: Instrument::CadUsd,
        }
    }

    /// Choose the field whose external source is always present
    ///
    /// That field falls back only to a local sample from the same day, so
    /// days without external coverage carry the latest external value
    /// forward instead of an older local one.
    pub fn with_authoritative(mut self, instrument: Instrument) -> Self {
        self.authoritative = instrument;
        self
    }

    pub fn calendar(&self) -> &C {
        &self.calendar
    }

    /// Reconcile over one of the chart periods
    pub fn reconcile_window(
        &self,
        local: &[RateSample],
        external: Option<&ExternalDailySeries>,
        window: HistoryWindow,
        now: Timestamp,
    ) -> Vec<DailyRecord> {
        self.reconcile(local, external, window.days(), now)
    }

    /// Reconcile the `days` most recent calendar days ending at `now`
    pub fn reconcile(
        &self,
        local: &[RateSample],
        external: Option<&ExternalDailySeries>,
        days: u32,
        now: Timestamp,
    ) -> Vec<DailyRecord> {
        let index = LocalIndex::build(&self.calendar, local);

        // Days before the first observation can only resolve to nothing
        let first_known = [index.first_day(), external.and_then(|s| s.first_day())]
            .into_iter()
            .flatten()
            .min();
        let Some(first_known) = first_known else {
            return Vec::new();
        };
        let span = self.calendar.day_of(now).days_since(first_known).saturating_add(1);
        let days = days.min(u32::try_from(span.max(0)).unwrap_or(u32::MAX));

        let day_keys = self.calendar.window_days(days, now);

        let mut carry = RateValues::default();
        let mut records = Vec::with_capacity(day_keys.len());

        for day in day_keys {
            let exact = index.latest_on(day);
            let fallback = exact.or_else(|| index.last_known_on_or_before(day));

            let mut resolved = RateValues::default();
            for instrument in Instrument::ALL {
                let local_source = if instrument == self.authoritative {
                    exact
                } else {
                    fallback
                };

                let value = external
                    .and_then(|series| series.value(instrument, day))
                    .or_else(|| {
                        local_source
                            .map(|sample| sample.get(instrument))
                            .filter(|v| *v > 0.0)
                    })
                    .unwrap_or_else(|| carry.get(instrument));

                resolved.set(instrument, value);
                // A zero resolution never clobbers a known carry value
                if value > 0.0 {
                    carry.set(instrument, value);
                }
            }

            if resolved.has_any_rate() {
                records.push(DailyRecord {
                    timestamp: self.calendar.start_of_day(day),
                    rates: resolved,
                });
            }
        }

        records.sort_by_key(|record| record.timestamp);

        log::debug!(
            "Reconciled {} local samples and {} external points into {} daily records",
            local.len(),
            external.map_or(0, |series| series.len()),
            records.len()
        );

        records
    }
}

impl ReconciliationEngine<ZoneCalendar> {
    /// Engine bucketing days in UTC
    pub fn utc() -> Self {
        Self::new(ZoneCalendar::utc())
    }
}

impl Default for ReconciliationEngine<ZoneCalendar> {
    fn default() -> Self {
        Self::utc()
    }
}

/// Local samples indexed by calendar day
struct LocalIndex<'a> {
    /// Samples with their day, ascending by timestamp
    dated: Vec<(DayKey, &'a RateSample)>,
    /// Latest sample of each day
    by_day: HashMap<DayKey, &'a RateSample>,
}

impl<'a> LocalIndex<'a> {
    fn build<C: DayCalendar + ?Sized>(calendar: &C, samples: &'a [RateSample]) -> Self {
        let mut dated: Vec<(DayKey, &'a RateSample)> = samples
            .iter()
            .map(|sample| (calendar.day_of(sample.timestamp), sample))
            .collect();
        dated.sort_by_key(|(_, sample)| sample.timestamp);

        let mut by_day: HashMap<DayKey, &'a RateSample> = HashMap::new();
        for &(day, sample) in &dated {
            match by_day.entry(day) {
                Entry::Occupied(mut slot) => {
                    if sample.timestamp > slot.get().timestamp {
                        slot.insert(sample);
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(sample);
                }
            }
        }

        Self { dated, by_day }
    }

    fn first_day(&self) -> Option<DayKey> {
        self.dated.first().map(|(day, _)| *day)
    }

    fn latest_on(&self, day: DayKey) -> Option<&'a RateSample> {
        self.by_day.get(&day).copied()
    }

    /// Most recent sample dated on or before `day`
    fn last_known_on_or_before(&self, day: DayKey) -> Option<&'a RateSample> {
        let end = self.dated.partition_point(|(sample_day, _)| *sample_day <= day);
        end.checked_sub(1).map(|i| self.dated[i].1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn day(s: &str) -> DayKey {
        s.parse().unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn sample(ts: Timestamp, instrument: Instrument, value: f64) -> RateSample {
        RateSample::new(ts, RateValues::default().with(instrument, value))
    }

    #[test]
    fn test_empty_inputs() {
        let engine = ReconciliationEngine::utc();
        for days in [0, 1, 7, 30, 90] {
            assert!(engine.reconcile(&[], None, days, at(2024, 1, 10, 12)).is_empty());
        }
    }

    #[test]
    fn test_end_to_end_three_days() {
        let engine = ReconciliationEngine::utc();
        let local = vec![
            sample(at(2024, 1, 1, 10), Instrument::BcvUsd, 36.5),
            sample(at(2024, 1, 3, 10), Instrument::BcvUsd, 37.0),
        ];
        let external = ExternalDailySeries::new()
            .with(Instrument::CadUsd, day("2024-01-01"), 1.30)
            .and_then(|s| s.with(Instrument::CadUsd, day("2024-01-02"), 1.31))
            .and_then(|s| s.with(Instrument::CadUsd, day("2024-01-03"), 1.32))
            .unwrap();

        let records = engine.reconcile(&local, Some(&external), 3, at(2024, 1, 3, 18));

        assert_eq!(records.len(), 3);
        let expected = [(1, 36.5, 1.30), (2, 36.5, 1.31), (3, 37.0, 1.32)];
        for (record, (d, bcv, cad)) in records.iter().zip(expected) {
            assert_eq!(record.timestamp, at(2024, 1, d, 0));
            assert_relative_eq!(record.rates.bcv_usd, bcv);
            assert_relative_eq!(record.rates.cad_usd, cad);
            assert_eq!(record.rates.bcv_eur, 0.0);
            assert_eq!(record.rates.binance, 0.0);
        }
    }

    #[test]
    fn test_single_sample_flat_line() {
        let engine = ReconciliationEngine::utc();
        let local = vec![RateSample::new(
            at(2024, 1, 5, 9),
            RateValues::new(36.0, 39.0, 38.5, 0.74),
        )];

        let records = engine.reconcile(&local, None, 7, at(2024, 1, 8, 12));

        // Window is Jan 2..=8; Jan 2-4 precede the sample and are omitted
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].timestamp, at(2024, 1, 5, 0));
        for record in &records {
            assert_eq!(record.rates, local[0].rates);
        }
    }

    #[test]
    fn test_no_future_leakage() {
        let engine = ReconciliationEngine::utc();
        let local = vec![
            sample(at(2024, 1, 1, 12), Instrument::Binance, 40.0),
            sample(at(2024, 1, 5, 12), Instrument::Binance, 50.0),
        ];

        let records = engine.reconcile(&local, None, 5, at(2024, 1, 5, 20));
        let values: Vec<f64> = records.iter().map(|r| r.rates.binance).collect();

        assert_eq!(values, vec![40.0, 40.0, 40.0, 40.0, 50.0]);
    }

    #[test]
    fn test_zero_never_overrides_carry() {
        let engine = ReconciliationEngine::utc();
        let local = vec![
            sample(at(2024, 1, 1, 12), Instrument::Binance, 100.0),
            RateSample::new(
                at(2024, 1, 10, 12),
                RateValues::default().with(Instrument::BcvUsd, 36.0),
            ),
        ];

        let records = engine.reconcile(&local, None, 10, at(2024, 1, 10, 20));

        assert_eq!(records.len(), 10);
        assert!(records.iter().all(|r| r.rates.binance == 100.0));
        assert_eq!(records[9].rates.bcv_usd, 36.0);
    }

    #[test]
    fn test_external_precedence() {
        let engine = ReconciliationEngine::utc();
        let local = vec![sample(at(2024, 1, 2, 12), Instrument::CadUsd, 1.30)];
        let external = ExternalDailySeries::new()
            .with(Instrument::CadUsd, day("2024-01-02"), 1.35)
            .unwrap();

        let records = engine.reconcile(&local, Some(&external), 1, at(2024, 1, 2, 20));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rates.cad_usd, 1.35);
    }

    #[test]
    fn test_authoritative_carries_external_over_old_local() {
        let engine = ReconciliationEngine::utc();
        let local = vec![sample(at(2024, 1, 1, 12), Instrument::CadUsd, 1.20)];
        let external = ExternalDailySeries::new()
            .with(Instrument::CadUsd, day("2024-01-03"), 1.34)
            .unwrap();

        let records = engine.reconcile(&local, Some(&external), 5, at(2024, 1, 5, 12));
        let cad: Vec<f64> = records.iter().map(|r| r.rates.cad_usd).collect();

        // Jan 4-5 have no coverage: carry the Jan 3 external value, not Jan 1's local one
        assert_eq!(cad, vec![1.20, 1.20, 1.34, 1.34, 1.34]);
    }

    #[test]
    fn test_non_authoritative_uses_backward_search() {
        let engine = ReconciliationEngine::utc();
        let local = vec![sample(at(2024, 1, 1, 12), Instrument::BcvUsd, 36.0)];
        let external = ExternalDailySeries::new()
            .with(Instrument::BcvUsd, day("2024-01-02"), 36.8)
            .unwrap();

        let records = engine.reconcile(&local, Some(&external), 3, at(2024, 1, 3, 12));
        let bcv: Vec<f64> = records.iter().map(|r| r.rates.bcv_usd).collect();

        // Jan 3 falls back to the latest local sample on or before it
        assert_eq!(bcv, vec![36.0, 36.8, 36.0]);
    }

    #[test]
    fn test_latest_sample_of_day_wins() {
        let engine = ReconciliationEngine::utc();
        let local = vec![
            sample(at(2024, 1, 2, 18), Instrument::Binance, 42.0),
            sample(at(2024, 1, 2, 8), Instrument::Binance, 41.0),
        ];

        let records = engine.reconcile(&local, None, 1, at(2024, 1, 2, 20));
        assert_eq!(records[0].rates.binance, 42.0);
    }

    #[test]
    fn test_external_only() {
        let engine = ReconciliationEngine::utc();
        let external = ExternalDailySeries::new()
            .with(Instrument::CadUsd, day("2024-01-04"), 0.74)
            .unwrap();

        let records = engine.reconcile(&[], Some(&external), 7, at(2024, 1, 7, 12));
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].timestamp, at(2024, 1, 4, 0));
        assert!(records.iter().all(|r| r.rates.cad_usd == 0.74));
    }

    #[test]
    fn test_samples_before_window_seed_carry() {
        let engine = ReconciliationEngine::utc();
        let local = vec![sample(at(2023, 12, 1, 12), Instrument::BcvEur, 39.0)];

        let records = engine.reconcile(&local, None, 3, at(2024, 1, 3, 12));
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.rates.bcv_eur == 39.0));
    }

    #[test]
    fn test_samples_after_now_ignored() {
        let engine = ReconciliationEngine::utc();
        let now = at(2024, 1, 3, 12);
        let local = vec![sample(now + Duration::days(2), Instrument::Binance, 45.0)];

        assert!(engine.reconcile(&local, None, 7, now).is_empty());
    }

    #[test]
    fn test_days_bucketed_in_reference_timezone() {
        let engine = ReconciliationEngine::new(ZoneCalendar::from_name("America/Caracas").unwrap());
        // 02:00 UTC on Jan 3 is 22:00 on Jan 2 in Caracas
        let local = vec![sample(at(2024, 1, 3, 2), Instrument::Binance, 38.0)];

        let records = engine.reconcile(&local, None, 2, at(2024, 1, 3, 20));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp, at(2024, 1, 2, 4));
    }

    #[test]
    fn test_reconcile_window() {
        let engine = ReconciliationEngine::utc();
        let local = vec![sample(at(2023, 12, 1, 12), Instrument::Binance, 35.0)];

        let now = at(2024, 1, 31, 12);
        let week = engine.reconcile_window(&local, None, HistoryWindow::Week, now);
        let month = engine.reconcile_window(&local, None, HistoryWindow::Month, now);
        assert_eq!(week.len(), 7);
        assert_eq!(month.len(), 30);
    }

    #[test]
    fn test_earliest_representable_now() {
        let engine = ReconciliationEngine::utc();
        let now = Timestamp::MIN_UTC;

        assert!(engine.reconcile(&[], None, 2, now).is_empty());
        assert!(engine.reconcile(&[], None, u32::MAX, now).is_empty());

        let local = vec![sample(now, Instrument::Binance, 38.0)];
        let records = engine.reconcile(&local, None, 2, now);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].timestamp, now);
    }

    #[test]
    fn test_huge_window_limited_to_known_days() {
        let engine = ReconciliationEngine::utc();
        let now = at(2024, 1, 10, 12);
        let local = vec![sample(at(2024, 1, 8, 9), Instrument::BcvUsd, 36.0)];
        let external = ExternalDailySeries::new()
            .with(Instrument::CadUsd, DayKey::from_ymd(2024, 1, 6).unwrap(), 0.74)
            .unwrap();

        let records = engine.reconcile(&local, Some(&external), u32::MAX, now);
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].timestamp, at(2024, 1, 6, 0));
        assert_eq!(records[4].timestamp, at(2024, 1, 10, 0));

        assert!(engine.reconcile(&[], None, u32::MAX, now).is_empty());
    }
}
