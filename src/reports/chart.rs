use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::reports::{RenderError, ReportRow};

pub const CHART_WIDTH: u32 = 1000;
pub const CHART_HEIGHT: u32 = 400;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Raster chart returned by the chart service
#[derive(Debug, Clone)]
pub struct ChartImage {
    pub png: Vec<u8>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChartRequest {
    width: u32,
    height: u32,
    device_pixel_ratio: u32,
    format: &'static str,
    background_color: &'static str,
    chart: Value,
}

/// Client for a QuickChart-compatible rendering service
#[derive(Clone)]
pub struct ChartRenderer {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl ChartRenderer {
    pub fn new(url: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            timeout,
        }
    }

    /// Chart.js line config with the four sensor series
    pub fn chart_config(rows: &[ReportRow]) -> Value {
        let labels: Vec<&str> = rows.iter().map(|r| r.chart_label.as_str()).collect();
        let series = |pick: fn(&ReportRow) -> Option<f64>| -> Vec<Option<f64>> {
            rows.iter().map(pick).collect()
        };

        json!({
            "type": "line",
            "data": {
                "labels": labels,
                "datasets": [
                    { "label": "Suhu In", "data": series(|r| r.avg_temp_in), "borderColor": "#3498db", "fill": false },
                    { "label": "pH In", "data": series(|r| r.avg_ph_in), "borderColor": "#f39c12", "fill": false },
                    { "label": "Suhu Out", "data": series(|r| r.avg_temp_out), "borderColor": "#e74c3c", "fill": false },
                    { "label": "pH Out", "data": series(|r| r.avg_ph_out), "borderColor": "#27ae60", "fill": false }
                ]
            }
        })
    }

    /// Render the chart remotely.
    ///
    /// The request runs as its own task; if it has not finished within the
    /// configured timeout the task is aborted and `ChartTimeout` returned.
    #[instrument(skip(self, rows), fields(url = %self.url, rows = rows.len()))]
    pub async fn render_chart(&self, rows: &[ReportRow]) -> Result<ChartImage, RenderError> {
        let body = ChartRequest {
            width: CHART_WIDTH,
            height: CHART_HEIGHT,
            device_pixel_ratio: 1,
            format: "png",
            background_color: "white",
            chart: Self::chart_config(rows),
        };

        debug!("Requesting chart with {} points per series", rows.len());
        let task = tokio::spawn(fetch_png(self.client.clone(), self.url.clone(), body));
        let abort = task.abort_handle();

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => {
                let image = result?;
                info!("Received chart image ({} bytes)", image.png.len());
                Ok(image)
            }
            Ok(Err(join_error)) => {
                error!("Chart task failed: {}", join_error);
                Err(RenderError::Join(join_error.to_string()))
            }
            Err(_) => {
                abort.abort();
                warn!("Chart service timed out after {:?}", self.timeout);
                Err(RenderError::ChartTimeout(self.timeout))
            }
        }
    }
}

async fn fetch_png(
    client: reqwest::Client,
    url: String,
    body: ChartRequest,
) -> Result<ChartImage, RenderError> {
    let response = client.post(&url).json(&body).send().await?;
    let status = response.status();
    debug!("Chart service responded with status: {}", status);

    if !status.is_success() {
        return Err(RenderError::ChartStatus(status.as_u16()));
    }

    let bytes = response.bytes().await?;
    if !bytes.starts_with(PNG_SIGNATURE) {
        return Err(RenderError::ChartImage(format!(
            "expected PNG data, got {} bytes of something else",
            bytes.len()
        )));
    }

    Ok(ChartImage { png: bytes.to_vec() })
}
