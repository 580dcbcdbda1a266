use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};

use crate::db::{DailyRollup, DbError, MonthlyRollup, NewReading, Reading};

/// Storage capability shared by the API and the bot.
///
/// Each binary builds exactly one store in its composition root and hands
/// clones of the `Arc` to the services that need it.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Append a reading; the store assigns the timestamp.
    async fn insert(&self, reading: &NewReading) -> Result<Reading, DbError>;

    /// Most recent reading by timestamp.
    async fn find_latest(&self) -> Result<Option<Reading>, DbError>;

    async fn count(&self) -> Result<i64, DbError>;

    /// Readings with `start <= timestamp < end`, oldest first.
    async fn find_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>, DbError>;

    /// Per-day averages over `[start, end)`, days taken in `offset`, ascending.
    /// Days without readings are omitted.
    async fn daily_rollups(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Result<Vec<DailyRollup>, DbError>;

    /// Per-month averages over `[start, end)`, months taken in `offset`, ascending.
    async fn monthly_rollups(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Result<Vec<MonthlyRollup>, DbError>;
}

pub type SharedStore = Arc<dyn ReadingStore>;
