use std::collections::BTreeMap;

use chrono::{Datelike, FixedOffset, NaiveDate};

use crate::db::{DailyRollup, MonthlyRollup, Reading};

impl DailyRollup {
    pub fn empty(day: NaiveDate) -> Self {
        Self {
            day,
            avg_ph_in: None,
            avg_ph_out: None,
            avg_temp_in: None,
            avg_temp_out: None,
            count: 0,
        }
    }
}

/// Running sums for one bucket
#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    ph_in: f64,
    ph_out: f64,
    temp_in: f64,
    temp_out: f64,
    count: i64,
}

impl Accumulator {
    fn add(&mut self, reading: &Reading) {
        self.ph_in += reading.ph_in;
        self.ph_out += reading.ph_out;
        self.temp_in += reading.temp_in;
        self.temp_out += reading.temp_out;
        self.count += 1;
    }

    fn mean(&self, sum: f64) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(sum / self.count as f64)
        }
    }
}

/// Group readings by local calendar day, ascending
pub fn rollup_by_day(readings: &[Reading], offset: FixedOffset) -> Vec<DailyRollup> {
    let mut buckets: BTreeMap<NaiveDate, Accumulator> = BTreeMap::new();
    for reading in readings {
        let day = reading.timestamp.with_timezone(&offset).date_naive();
        buckets.entry(day).or_default().add(reading);
    }

    buckets
        .into_iter()
        .map(|(day, acc)| DailyRollup {
            day,
            avg_ph_in: acc.mean(acc.ph_in),
            avg_ph_out: acc.mean(acc.ph_out),
            avg_temp_in: acc.mean(acc.temp_in),
            avg_temp_out: acc.mean(acc.temp_out),
            count: acc.count,
        })
        .collect()
}

/// Group readings by local calendar month, ascending
pub fn rollup_by_month(readings: &[Reading], offset: FixedOffset) -> Vec<MonthlyRollup> {
    let mut buckets: BTreeMap<(i32, u32), Accumulator> = BTreeMap::new();
    for reading in readings {
        let local = reading.timestamp.with_timezone(&offset);
        buckets
            .entry((local.year(), local.month()))
            .or_default()
            .add(reading);
    }

    buckets
        .into_iter()
        .map(|((year, month), acc)| MonthlyRollup {
            year,
            month,
            avg_ph_in: acc.mean(acc.ph_in),
            avg_ph_out: acc.mean(acc.ph_out),
            avg_temp_in: acc.mean(acc.temp_in),
            avg_temp_out: acc.mean(acc.temp_out),
            count: acc.count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn wib() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn reading(ts: DateTime<Utc>, ph_in: f64) -> Reading {
        Reading {
            ph_in,
            ph_out: 7.0,
            temp_in: 30.0,
            temp_out: 29.0,
            timestamp: ts,
        }
    }

    #[test]
    fn test_rollup_by_day_uses_local_day() {
        // 18:00 UTC on the 9th is 01:00 WIB on the 10th
        let readings = vec![
            reading(Utc.with_ymd_and_hms(2024, 3, 9, 18, 0, 0).unwrap(), 6.0),
            reading(Utc.with_ymd_and_hms(2024, 3, 10, 2, 0, 0).unwrap(), 8.0),
            reading(Utc.with_ymd_and_hms(2024, 3, 9, 9, 0, 0).unwrap(), 5.0),
        ];

        let rollups = rollup_by_day(&readings, wib());
        assert_eq!(rollups.len(), 2);
        assert_eq!(rollups[0].day, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(rollups[0].count, 1);
        assert_eq!(rollups[1].day, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(rollups[1].count, 2);
        assert_eq!(rollups[1].avg_ph_in, Some(7.0));
    }

    #[test]
    fn test_rollup_by_month_groups_and_orders() {
        let readings = vec![
            reading(Utc.with_ymd_and_hms(2024, 5, 2, 3, 0, 0).unwrap(), 7.0),
            reading(Utc.with_ymd_and_hms(2024, 1, 15, 3, 0, 0).unwrap(), 6.0),
            reading(Utc.with_ymd_and_hms(2024, 1, 20, 3, 0, 0).unwrap(), 8.0),
        ];

        let rollups = rollup_by_month(&readings, wib());
        let months: Vec<u32> = rollups.iter().map(|r| r.month).collect();
        assert_eq!(months, vec![1, 5]);
        assert_eq!(rollups[0].count, 2);
        assert_eq!(rollups[0].avg_ph_in, Some(7.0));
    }

    #[test]
    fn test_empty_accumulator_has_no_mean() {
        let acc = Accumulator::default();
        assert_eq!(acc.mean(0.0), None);
    }
}
