use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use tokio::sync::RwLock;

use crate::db::{
    rollup_by_day, rollup_by_month, DailyRollup, DbError, MonthlyRollup, NewReading, Reading,
    ReadingStore,
};

/// In-process store used by tests and local demos.
#[derive(Default)]
pub struct MemoryStore {
    readings: RwLock<Vec<Reading>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with readings that already carry a timestamp
    pub fn with_readings(readings: Vec<Reading>) -> Self {
        Self {
            readings: RwLock::new(readings),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with `DbError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), DbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn insert(&self, reading: &NewReading) -> Result<Reading, DbError> {
        self.check()?;
        let stored = Reading {
            ph_in: reading.ph_in,
            ph_out: reading.ph_out,
            temp_in: reading.temp_in,
            temp_out: reading.temp_out,
            timestamp: Utc::now(),
        };
        self.readings.write().await.push(stored.clone());
        Ok(stored)
    }

    async fn find_latest(&self) -> Result<Option<Reading>, DbError> {
        self.check()?;
        let readings = self.readings.read().await;
        Ok(readings.iter().max_by_key(|r| r.timestamp).cloned())
    }

    async fn count(&self) -> Result<i64, DbError> {
        self.check()?;
        Ok(self.readings.read().await.len() as i64)
    }

    async fn find_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>, DbError> {
        self.check()?;
        let mut matching: Vec<Reading> = self
            .readings
            .read()
            .await
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp < end)
            .cloned()
            .collect();
        matching.sort_by_key(|r| r.timestamp);
        Ok(matching)
    }

    async fn daily_rollups(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Result<Vec<DailyRollup>, DbError> {
        let readings = self.find_by_date_range(start, end).await?;
        Ok(rollup_by_day(&readings, offset))
    }

    async fn monthly_rollups(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Result<Vec<MonthlyRollup>, DbError> {
        let readings = self.find_by_date_range(start, end).await?;
        Ok(rollup_by_month(&readings, offset))
    }
}
