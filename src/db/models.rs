use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// Database entity models
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Reading {
    pub ph_in: f64,
    pub ph_out: f64,
    pub temp_in: f64,
    pub temp_out: f64,
    pub timestamp: DateTime<Utc>,
}

/// A validated reading waiting for its server-assigned timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewReading {
    pub ph_in: f64,
    pub ph_out: f64,
    pub temp_in: f64,
    pub temp_out: f64,
}

// Derived rollups (recomputed per request, never persisted)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, ToSchema)]
pub struct DailyRollup {
    pub day: NaiveDate,
    pub avg_ph_in: Option<f64>,
    pub avg_ph_out: Option<f64>,
    pub avg_temp_in: Option<f64>,
    pub avg_temp_out: Option<f64>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyRollup {
    pub year: i32,
    pub month: u32,
    pub avg_ph_in: Option<f64>,
    pub avg_ph_out: Option<f64>,
    pub avg_temp_in: Option<f64>,
    pub avg_temp_out: Option<f64>,
    pub count: i64,
}
