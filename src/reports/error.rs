use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Chart service request failed: {0}")]
    ChartService(#[from] reqwest::Error),
    #[error("Chart service returned HTTP {0}")]
    ChartStatus(u16),
    #[error("Chart service did not answer within {0:?}")]
    ChartTimeout(Duration),
    #[error("Chart image could not be decoded: {0}")]
    ChartImage(String),
    #[error("PDF generation failed: {0}")]
    Document(String),
    #[error("Report file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Render task failed: {0}")]
    Join(String),
}
