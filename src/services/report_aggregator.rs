use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Utc};
use tracing::{debug, instrument};

use crate::db::{DailyRollup, DbError, MonthlyRollup, SharedStore};

/// Length of the trailing window served by `/api/data/last30days`
pub const TRAILING_WINDOW_DAYS: i64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error(transparent)]
    Store(#[from] DbError),
    #[error("Invalid report period {month:02}/{year}")]
    InvalidPeriod { month: u32, year: i32 },
}

/// Builds daily, monthly and trailing-window rollups through the store.
///
/// Calendar days are evaluated in a fixed UTC offset so that a reading taken
/// at 23:30 local time lands on the local day, not the UTC one.
#[derive(Clone)]
pub struct ReportAggregator {
    store: SharedStore,
    offset: FixedOffset,
}

impl ReportAggregator {
    pub fn new(store: SharedStore, offset: FixedOffset) -> Self {
        Self { store, offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Local calendar day of `now`
    pub fn local_today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// Rollup for one calendar day; zero-count when nothing was recorded
    #[instrument(skip(self))]
    pub async fn daily_average(&self, day: NaiveDate) -> Result<DailyRollup, AggregateError> {
        let start = local_midnight(day, self.offset);
        let end = start + Duration::days(1);
        let rollup = self
            .store
            .daily_rollups(start, end, self.offset)
            .await?
            .into_iter()
            .next()
            .unwrap_or_else(|| DailyRollup::empty(day));
        debug!("Found {} readings for {}", rollup.count, day);

        Ok(rollup)
    }

    /// Daily rollups inside one month, oldest day first
    #[instrument(skip(self))]
    pub async fn monthly_rollups(
        &self,
        month: u32,
        year: i32,
    ) -> Result<Vec<DailyRollup>, AggregateError> {
        let (start, end) = month_bounds(month, year, self.offset)
            .ok_or(AggregateError::InvalidPeriod { month, year })?;

        let rollups = self.store.daily_rollups(start, end, self.offset).await?;
        debug!("Found {} days with data for {:02}/{}", rollups.len(), month, year);
        Ok(rollups)
    }

    /// Monthly rollups inside one year, skipping months with no data
    #[instrument(skip(self))]
    pub async fn yearly_rollups(&self, year: i32) -> Result<Vec<MonthlyRollup>, AggregateError> {
        let (start, _) = month_bounds(1, year, self.offset)
            .ok_or(AggregateError::InvalidPeriod { month: 1, year })?;
        let (_, end) = month_bounds(12, year, self.offset)
            .ok_or(AggregateError::InvalidPeriod { month: 12, year })?;

        let rollups = self.store.monthly_rollups(start, end, self.offset).await?;
        debug!("Found {} months with data for {}", rollups.len(), year);
        Ok(rollups)
    }

    /// Daily rollups for readings newer than `now - 30 days`
    #[instrument(skip(self))]
    pub async fn last_30_days(&self, now: DateTime<Utc>) -> Result<Vec<DailyRollup>, AggregateError> {
        let start = now - Duration::days(TRAILING_WINDOW_DAYS);
        // Half-open range; include readings stamped at exactly `now`
        let end = now + Duration::seconds(1);
        Ok(self.store.daily_rollups(start, end, self.offset).await?)
    }
}

/// UTC instant of local midnight starting `day`
pub fn local_midnight(day: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let naive = day.and_time(NaiveTime::MIN);
    let utc = naive - Duration::seconds(offset.local_minus_utc() as i64);
    DateTime::<Utc>::from_naive_utc_and_offset(utc, Utc)
}

/// `[first day of month, first day of next month)` in UTC; `None` for an invalid month
pub fn month_bounds(
    month: u32,
    year: i32,
    offset: FixedOffset,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((local_midnight(first, offset), local_midnight(next, offset)))
}
