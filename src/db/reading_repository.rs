use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, info, instrument};

use crate::db::{DailyRollup, DbError, MonthlyRollup, NewReading, Reading, ReadingStore};

/// PostgreSQL-backed store over the `sensor_data` table
#[derive(Clone)]
pub struct ReadingRepository {
    pool: PgPool,
}

impl ReadingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Postgres has no unsigned types; converted into `MonthlyRollup` after the fetch
#[derive(FromRow)]
struct MonthlyRollupRow {
    year: i32,
    month: i32,
    avg_ph_in: Option<f64>,
    avg_ph_out: Option<f64>,
    avg_temp_in: Option<f64>,
    avg_temp_out: Option<f64>,
    count: i64,
}

impl From<MonthlyRollupRow> for MonthlyRollup {
    fn from(row: MonthlyRollupRow) -> Self {
        Self {
            year: row.year,
            month: row.month as u32,
            avg_ph_in: row.avg_ph_in,
            avg_ph_out: row.avg_ph_out,
            avg_temp_in: row.avg_temp_in,
            avg_temp_out: row.avg_temp_out,
            count: row.count,
        }
    }
}

fn offset_seconds(offset: FixedOffset) -> f64 {
    f64::from(offset.local_minus_utc())
}

#[async_trait]
impl ReadingStore for ReadingRepository {
    #[instrument(skip(self))]
    async fn insert(&self, reading: &NewReading) -> Result<Reading, DbError> {
        let stored = sqlx::query_as::<_, Reading>(
            r#"
            INSERT INTO sensor_data (ph_in, ph_out, temp_in, temp_out, timestamp)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING ph_in, ph_out, temp_in, temp_out, timestamp
            "#,
        )
        .bind(reading.ph_in)
        .bind(reading.ph_out)
        .bind(reading.temp_in)
        .bind(reading.temp_out)
        .fetch_one(&self.pool)
        .await?;

        info!("Inserted reading at {}", stored.timestamp);
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn find_latest(&self) -> Result<Option<Reading>, DbError> {
        debug!("Querying for latest reading");

        let reading = sqlx::query_as::<_, Reading>(
            r#"
            SELECT ph_in, ph_out, temp_in, temp_out, timestamp
            FROM sensor_data
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        if reading.is_some() {
            debug!("Found latest reading");
        } else {
            debug!("No readings found in database");
        }

        Ok(reading)
    }

    #[instrument(skip(self))]
    async fn count(&self) -> Result<i64, DbError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM sensor_data")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    #[instrument(skip(self))]
    async fn find_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>, DbError> {
        debug!("Querying readings from {} to {}", start, end);

        let readings = sqlx::query_as::<_, Reading>(
            r#"
            SELECT ph_in, ph_out, temp_in, temp_out, timestamp
            FROM sensor_data
            WHERE timestamp >= $1 AND timestamp < $2
            ORDER BY timestamp ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} readings", readings.len());
        Ok(readings)
    }

    /// Local wall-clock time is `timestamp + offset` read back as UTC
    #[instrument(skip(self))]
    async fn daily_rollups(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Result<Vec<DailyRollup>, DbError> {
        let rollups = sqlx::query_as::<_, DailyRollup>(
            r#"
            SELECT local_ts::date AS day,
                   AVG(ph_in) AS avg_ph_in,
                   AVG(ph_out) AS avg_ph_out,
                   AVG(temp_in) AS avg_temp_in,
                   AVG(temp_out) AS avg_temp_out,
                   COUNT(*) AS count
            FROM (
                SELECT ph_in, ph_out, temp_in, temp_out,
                       (timestamp + make_interval(secs => $3::double precision)) AT TIME ZONE 'UTC' AS local_ts
                FROM sensor_data
                WHERE timestamp >= $1 AND timestamp < $2
            ) AS local_readings
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(offset_seconds(offset))
        .fetch_all(&self.pool)
        .await?;

        debug!("Aggregated {} days from {} to {}", rollups.len(), start, end);
        Ok(rollups)
    }

    #[instrument(skip(self))]
    async fn monthly_rollups(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Result<Vec<MonthlyRollup>, DbError> {
        let rows = sqlx::query_as::<_, MonthlyRollupRow>(
            r#"
            SELECT EXTRACT(YEAR FROM local_ts)::int4 AS year,
                   EXTRACT(MONTH FROM local_ts)::int4 AS month,
                   AVG(ph_in) AS avg_ph_in,
                   AVG(ph_out) AS avg_ph_out,
                   AVG(temp_in) AS avg_temp_in,
                   AVG(temp_out) AS avg_temp_out,
                   COUNT(*) AS count
            FROM (
                SELECT ph_in, ph_out, temp_in, temp_out,
                       (timestamp + make_interval(secs => $3::double precision)) AT TIME ZONE 'UTC' AS local_ts
                FROM sensor_data
                WHERE timestamp >= $1 AND timestamp < $2
            ) AS local_readings
            GROUP BY 1, 2
            ORDER BY 1, 2
            "#,
        )
        .bind(start)
        .bind(end)
        .bind(offset_seconds(offset))
        .fetch_all(&self.pool)
        .await?;

        debug!("Aggregated {} months from {} to {}", rows.len(), start, end);
        Ok(rows.into_iter().map(MonthlyRollup::from).collect())
    }
}
