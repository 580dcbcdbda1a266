pub mod reading_service;
pub mod report_aggregator;

pub use reading_service::ReadingService;
pub use report_aggregator::{AggregateError, ReportAggregator};
