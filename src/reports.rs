pub mod builder;
pub mod chart;
pub mod document;
pub mod error;

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::db::{DailyRollup, MonthlyRollup};

pub use builder::{ReportBuilder, ReportError};
pub use chart::{ChartImage, ChartRenderer};
pub use document::DocumentRenderer;
pub use error::RenderError;

/// Placeholder shown wherever an average is undefined (no readings)
pub const NO_DATA: &str = "-";

/// What a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPeriod {
    Month { month: u32, year: i32 },
    Year { year: i32 },
}

impl ReportPeriod {
    /// `3/2024` or `2024`
    pub fn label(&self) -> String {
        match self {
            ReportPeriod::Month { month, year } => format!("{}/{}", month, year),
            ReportPeriod::Year { year } => year.to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        match self {
            ReportPeriod::Month { month, year } => format!("Rekap_{}_{}.pdf", month, year),
            ReportPeriod::Year { year } => format!("Rekap_Tahunan_{}.pdf", year),
        }
    }

    /// Inverse of `file_name`; only canonical names are accepted
    pub fn from_file_name(name: &str) -> Option<ReportPeriod> {
        let stem = name.strip_prefix("Rekap_")?.strip_suffix(".pdf")?;
        let period = match stem.strip_prefix("Tahunan_") {
            Some(year) => ReportPeriod::Year {
                year: year.parse().ok()?,
            },
            None => {
                let (month, year) = stem.split_once('_')?;
                let month: u32 = month.parse().ok()?;
                if !(1..=12).contains(&month) {
                    return None;
                }
                ReportPeriod::Month {
                    month,
                    year: year.parse().ok()?,
                }
            }
        };
        (period.file_name() == name).then_some(period)
    }

    pub fn caption(&self) -> String {
        match self {
            ReportPeriod::Month { .. } => format!("Laporan Bulanan {}", self.label()),
            ReportPeriod::Year { .. } => format!("Laporan Tahunan {}", self.label()),
        }
    }

    pub fn table_title(&self) -> &'static str {
        match self {
            ReportPeriod::Month { .. } => "DATA HARIAN",
            ReportPeriod::Year { .. } => "DATA BULANAN",
        }
    }

    pub fn bucket_summary_label(&self) -> &'static str {
        match self {
            ReportPeriod::Month { .. } => "Total hari terekam",
            ReportPeriod::Year { .. } => "Total bulan terekam",
        }
    }
}

/// One row of a report, independent of the bucket size it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub chart_label: String,
    pub table_label: String,
    pub avg_temp_in: Option<f64>,
    pub avg_ph_in: Option<f64>,
    pub avg_temp_out: Option<f64>,
    pub avg_ph_out: Option<f64>,
    pub count: i64,
}

impl From<&DailyRollup> for ReportRow {
    fn from(rollup: &DailyRollup) -> Self {
        Self {
            chart_label: rollup.day.format("%d/%m").to_string(),
            table_label: rollup.day.format("%d/%m/%Y").to_string(),
            avg_temp_in: rollup.avg_temp_in,
            avg_ph_in: rollup.avg_ph_in,
            avg_temp_out: rollup.avg_temp_out,
            avg_ph_out: rollup.avg_ph_out,
            count: rollup.count,
        }
    }
}

impl From<&MonthlyRollup> for ReportRow {
    fn from(rollup: &MonthlyRollup) -> Self {
        let label = NaiveDate::from_ymd_opt(rollup.year, rollup.month, 1)
            .map(|d| d.format("%m/%Y").to_string())
            .unwrap_or_else(|| format!("{:02}/{}", rollup.month, rollup.year));
        Self {
            chart_label: label.clone(),
            table_label: label,
            avg_temp_in: rollup.avg_temp_in,
            avg_ph_in: rollup.avg_ph_in,
            avg_temp_out: rollup.avg_temp_out,
            avg_ph_out: rollup.avg_ph_out,
            count: rollup.count,
        }
    }
}

/// Two decimals, or the no-data placeholder
pub fn format_average(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| NO_DATA.to_string())
}

/// A document written to the reports directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub path: PathBuf,
    pub byte_size: u64,
}
