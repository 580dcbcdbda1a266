use chrono::Utc;
use tracing::{info, instrument};

use crate::reports::{
    ChartRenderer, DocumentRenderer, RenderError, RenderedReport, ReportPeriod, ReportRow,
};
use crate::services::{AggregateError, ReportAggregator};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Aggregate, chart and write one report end to end
#[derive(Clone)]
pub struct ReportBuilder {
    aggregator: ReportAggregator,
    chart: ChartRenderer,
    document: DocumentRenderer,
}

impl ReportBuilder {
    pub fn new(
        aggregator: ReportAggregator,
        chart: ChartRenderer,
        document: DocumentRenderer,
    ) -> Self {
        Self {
            aggregator,
            chart,
            document,
        }
    }

    /// Rows for the period, one per day (monthly) or per month (yearly)
    pub async fn rows(&self, period: ReportPeriod) -> Result<Vec<ReportRow>, AggregateError> {
        let rows = match period {
            ReportPeriod::Month { month, year } => self
                .aggregator
                .monthly_rollups(month, year)
                .await?
                .iter()
                .map(ReportRow::from)
                .collect(),
            ReportPeriod::Year { year } => self
                .aggregator
                .yearly_rollups(year)
                .await?
                .iter()
                .map(ReportRow::from)
                .collect(),
        };
        Ok(rows)
    }

    /// `Ok(None)` when the period has no readings; no file is written then
    #[instrument(skip(self))]
    pub async fn build(&self, period: ReportPeriod) -> Result<Option<RenderedReport>, ReportError> {
        let rows = self.rows(period).await?;
        if rows.is_empty() {
            info!("No readings for {}, skipping report", period.label());
            return Ok(None);
        }

        let chart = self.chart.render_chart(&rows).await?;

        let document = self.document.clone();
        let report = tokio::task::spawn_blocking(move || {
            document.render_document(&period, &rows, &chart, Utc::now())
        })
        .await
        .map_err(|e| RenderError::Join(e.to_string()))??;

        info!(
            "Built report {} for {}",
            report.path.display(),
            period.label()
        );
        Ok(Some(report))
    }
}
