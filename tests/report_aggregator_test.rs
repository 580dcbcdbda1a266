// Rollup behaviour of ReportAggregator over the memory store, evaluated at UTC+7

use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
use sensor_monitor_service::services::{AggregateError, ReportAggregator};

mod common;
use common::{memory_store, reading};

fn wib() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).unwrap()
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn march_fixture() -> ReportAggregator {
    let (_, shared) = memory_store(vec![
        // 10 March, 08:00-10:00 local
        reading(Utc.with_ymd_and_hms(2024, 3, 10, 1, 0, 0).unwrap(), 6.0, 28.0),
        reading(Utc.with_ymd_and_hms(2024, 3, 10, 2, 0, 0).unwrap(), 7.0, 29.0),
        reading(Utc.with_ymd_and_hms(2024, 3, 10, 3, 0, 0).unwrap(), 8.0, 30.0),
        // 10 March 20:00 UTC is already 11 March locally
        reading(Utc.with_ymd_and_hms(2024, 3, 10, 20, 0, 0).unwrap(), 7.5, 27.0),
        // 31 March 17:30 UTC is 1 April 00:30 locally
        reading(Utc.with_ymd_and_hms(2024, 3, 31, 17, 30, 0).unwrap(), 6.5, 26.0),
    ]);
    ReportAggregator::new(shared, wib())
}

#[tokio::test]
async fn test_daily_average_of_three_readings() {
    let aggregator = march_fixture();

    let rollup = aggregator.daily_average(date(2024, 3, 10)).await.unwrap();

    assert_eq!(rollup.count, 3);
    assert_eq!(rollup.avg_ph_in, Some(7.0));
    assert_eq!(rollup.avg_temp_in, Some(29.0));
    assert_eq!(rollup.avg_ph_out, Some(7.0));
}

#[tokio::test]
async fn test_daily_average_without_readings_is_empty() {
    let aggregator = march_fixture();

    let rollup = aggregator.daily_average(date(2024, 3, 12)).await.unwrap();

    assert_eq!(rollup.day, date(2024, 3, 12));
    assert_eq!(rollup.count, 0);
    assert_eq!(rollup.avg_ph_in, None);
    assert_eq!(rollup.avg_temp_out, None);
}

#[tokio::test]
async fn test_local_day_wins_over_utc_day() {
    let aggregator = march_fixture();

    let eleventh = aggregator.daily_average(date(2024, 3, 11)).await.unwrap();

    assert_eq!(eleventh.count, 1);
    assert_eq!(eleventh.avg_ph_in, Some(7.5));
}

#[tokio::test]
async fn test_monthly_rollups_are_ascending_and_local() {
    let aggregator = march_fixture();

    let days = aggregator.monthly_rollups(3, 2024).await.unwrap();

    let listed: Vec<NaiveDate> = days.iter().map(|d| d.day).collect();
    assert_eq!(listed, vec![date(2024, 3, 10), date(2024, 3, 11)]);
    assert_eq!(days[0].count, 3);
}

#[tokio::test]
async fn test_month_without_data_is_empty() {
    let aggregator = march_fixture();

    let days = aggregator.monthly_rollups(2, 2024).await.unwrap();

    assert!(days.is_empty());
}

#[tokio::test]
async fn test_reading_after_local_midnight_belongs_to_next_month() {
    let aggregator = march_fixture();

    let april = aggregator.monthly_rollups(4, 2024).await.unwrap();

    assert_eq!(april.len(), 1);
    assert_eq!(april[0].day, date(2024, 4, 1));
}

#[tokio::test]
async fn test_invalid_month_is_rejected() {
    let aggregator = march_fixture();

    let err = aggregator.monthly_rollups(13, 2024).await.unwrap_err();

    assert!(matches!(
        err,
        AggregateError::InvalidPeriod {
            month: 13,
            year: 2024
        }
    ));
}

#[tokio::test]
async fn test_yearly_rollups_group_by_month() {
    let aggregator = march_fixture();

    let months = aggregator.yearly_rollups(2024).await.unwrap();

    let listed: Vec<(u32, i64)> = months.iter().map(|m| (m.month, m.count)).collect();
    assert_eq!(listed, vec![(3, 4), (4, 1)]);
    assert_eq!(months[0].year, 2024);
    assert_eq!(months[0].avg_ph_in, Some(7.125));

    assert!(aggregator.yearly_rollups(2023).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_last_30_days_window() {
    let aggregator = march_fixture();
    // 25 April 12:00 local; 10-11 March fall outside the window
    let now = Utc.with_ymd_and_hms(2024, 4, 25, 5, 0, 0).unwrap();

    let days = aggregator.last_30_days(now).await.unwrap();

    assert_eq!(days.len(), 1);
    assert_eq!(days[0].day, date(2024, 4, 1));
}

#[tokio::test]
async fn test_store_failure_propagates() {
    let (store, shared) = memory_store(vec![]);
    store.set_unavailable(true);
    let aggregator = ReportAggregator::new(shared, wib());

    let err = aggregator.daily_average(date(2024, 3, 10)).await.unwrap_err();

    assert!(matches!(err, AggregateError::Store(_)));
}
