use chrono::{FixedOffset, Utc};
use tracing::{debug, error, info, instrument};

use crate::bot::command::{parse_command, Command};
use crate::bot::reply::{Reply, ReplySink, SinkError};
use crate::db::{DailyRollup, DbError, Reading};
use crate::reports::{format_average, ReportBuilder, ReportError, ReportPeriod};
use crate::services::{AggregateError, ReadingService, ReportAggregator};

pub const GENERIC_FAILURE: &str = "Terjadi kesalahan pada bot.";
pub const NO_DATA_REPLY: &str = "Tidak ada data.";
pub const REPORT_IN_PROGRESS: &str = "Membuat laporan PDF...";

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error(transparent)]
    Store(#[from] DbError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Maps parsed chat commands onto store reads and report builds
#[derive(Clone)]
pub struct Dispatcher {
    reading_service: ReadingService,
    aggregator: ReportAggregator,
    reports: ReportBuilder,
    timezone_label: String,
    dashboard_url: Option<String>,
}

impl Dispatcher {
    pub fn new(
        reading_service: ReadingService,
        aggregator: ReportAggregator,
        reports: ReportBuilder,
        timezone_label: String,
        dashboard_url: Option<String>,
    ) -> Self {
        Self {
            reading_service,
            aggregator,
            reports,
            timezone_label,
            dashboard_url,
        }
    }

    /// Handle one inbound message.
    ///
    /// Unrecognized text produces no reply. Failures are logged and the
    /// requester only ever sees `GENERIC_FAILURE`.
    #[instrument(skip(self, sink))]
    pub async fn handle(&self, text: &str, sink: &mut dyn ReplySink) {
        let Some(command) = parse_command(text) else {
            debug!("Ignoring unrecognized message");
            return;
        };

        info!("Dispatching {:?}", command);
        if let Err(e) = self.execute(command, sink).await {
            error!("Command {:?} failed: {}", command, e);
            if let Err(send_error) = sink.send(Reply::text(GENERIC_FAILURE)).await {
                error!("Failed to deliver failure reply: {}", send_error);
            }
        }
    }

    async fn execute(&self, command: Command, sink: &mut dyn ReplySink) -> Result<(), BotError> {
        match command {
            Command::Menu => {
                sink.send(Reply::text(format_menu(self.dashboard_url.as_deref())))
                    .await?;
            }
            Command::Status => {
                let reply = match self.reading_service.get_latest_reading().await? {
                    Some(reading) => format_status(
                        &reading,
                        self.aggregator.offset(),
                        &self.timezone_label,
                    ),
                    None => NO_DATA_REPLY.to_string(),
                };
                sink.send(Reply::text(reply)).await?;
            }
            Command::Daily => {
                let today = self.aggregator.local_today(Utc::now());
                let rollup = self.aggregator.daily_average(today).await?;
                sink.send(Reply::text(format_daily(&rollup))).await?;
            }
            Command::ReportUsage(kind) => {
                sink.send(Reply::text(kind.usage())).await?;
            }
            Command::Report(period) => self.send_report(period, sink).await?,
        }
        Ok(())
    }

    async fn send_report(
        &self,
        period: ReportPeriod,
        sink: &mut dyn ReplySink,
    ) -> Result<(), BotError> {
        sink.send(Reply::text(REPORT_IN_PROGRESS)).await?;

        match self.reports.build(period).await? {
            Some(report) => {
                sink.send(Reply::Document {
                    path: report.path,
                    caption: period.caption(),
                    byte_size: report.byte_size,
                })
                .await?
            }
            None => sink.send(Reply::text(NO_DATA_REPLY)).await?,
        }
        Ok(())
    }
}

pub fn format_menu(dashboard_url: Option<&str>) -> String {
    let mut menu = String::from(
        "📂 *Menu Utama - IPAL*\n\n\
         📊 !status → Data terbaru\n\
         🌡️ !harian → Rata-rata hari ini\n\
         📋 !rekap MM/YYYY → PDF Bulanan\n\
         📆 !tahun YYYY → PDF Tahunan",
    );
    if let Some(url) = dashboard_url {
        menu.push_str(&format!("\n\nDashboard: {}", url));
    }
    menu
}

pub fn format_status(reading: &Reading, offset: FixedOffset, timezone_label: &str) -> String {
    let local = reading.timestamp.with_timezone(&offset);
    format!(
        "📊 *STATUS TERBARU*\n\n\
         🌡 *Input*\n\
         • Suhu: {:.2}°C\n\
         • pH: {:.2}\n\n\
         🌡 *Output*\n\
         • Suhu: {:.2}°C\n\
         • pH: {:.2}\n\n\
         ⏱ {} {}",
        reading.temp_in,
        reading.ph_in,
        reading.temp_out,
        reading.ph_out,
        local.format("%d/%m/%Y %H:%M"),
        timezone_label
    )
}

fn with_unit(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(_) => format!("{}{}", format_average(value), unit),
        None => format_average(None),
    }
}

pub fn format_daily(rollup: &DailyRollup) -> String {
    format!(
        "📋 *LAPORAN HARI INI*\n\n\
         🌡 Input\n\
         • Suhu: {}\n\
         • pH: {}\n\n\
         🌡 Output\n\
         • Suhu: {}\n\
         • pH: {}\n\n\
         Jumlah Data: {}",
        with_unit(rollup.avg_temp_in, "°C"),
        format_average(rollup.avg_ph_in),
        with_unit(rollup.avg_temp_out, "°C"),
        format_average(rollup.avg_ph_out),
        rollup.count
    )
}
