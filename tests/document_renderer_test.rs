// PDF output of DocumentRenderer, read back with lopdf

use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
use sensor_monitor_service::db::DailyRollup;
use sensor_monitor_service::reports::{
    ChartImage, DocumentRenderer, RenderError, ReportPeriod, ReportRow,
};

mod common;
use common::tiny_png;

fn daily_rows(days: u32) -> Vec<ReportRow> {
    (1..=days)
        .map(|day| DailyRollup {
            day: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            avg_ph_in: Some(7.0),
            avg_ph_out: Some(7.2),
            avg_temp_in: Some(29.0 + day as f64 / 10.0),
            avg_temp_out: None,
            count: 24,
        })
        .map(|rollup| ReportRow::from(&rollup))
        .collect()
}

fn renderer(dir: &std::path::Path) -> DocumentRenderer {
    DocumentRenderer::new(
        dir.to_path_buf(),
        FixedOffset::east_opt(7 * 3600).unwrap(),
        "WIB".to_string(),
    )
}

fn chart() -> ChartImage {
    ChartImage { png: tiny_png() }
}

#[test]
fn test_month_with_31_days_spans_three_pages() {
    let dir = tempfile::tempdir().unwrap();
    let period = ReportPeriod::Month { month: 3, year: 2024 };
    let printed_at = Utc.with_ymd_and_hms(2024, 4, 1, 2, 0, 0).unwrap();

    let report = renderer(dir.path())
        .render_document(&period, &daily_rows(31), &chart(), printed_at)
        .unwrap();

    assert_eq!(report.path, dir.path().join("Rekap_3_2024.pdf"));
    assert!(report.byte_size > 0);

    let bytes = std::fs::read(&report.path).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    assert_eq!(bytes.len() as u64, report.byte_size);

    // Summary page, then 27 + 4 table rows
    let doc = lopdf::Document::load(&report.path).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
}

#[test]
fn test_short_month_fits_on_one_table_page() {
    let dir = tempfile::tempdir().unwrap();
    let period = ReportPeriod::Month { month: 2, year: 2024 };

    let report = renderer(dir.path())
        .render_document(&period, &daily_rows(5), &chart(), Utc::now())
        .unwrap();

    let doc = lopdf::Document::load(&report.path).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
}

#[test]
fn test_yearly_report_name() {
    let dir = tempfile::tempdir().unwrap();
    let period = ReportPeriod::Year { year: 2024 };

    let report = renderer(dir.path())
        .render_document(&period, &daily_rows(3), &chart(), Utc::now())
        .unwrap();

    assert_eq!(report.path, dir.path().join("Rekap_Tahunan_2024.pdf"));
}

#[test]
fn test_existing_report_is_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let period = ReportPeriod::Month { month: 3, year: 2024 };
    let path = dir.path().join("Rekap_3_2024.pdf");
    std::fs::write(&path, b"stale").unwrap();

    let report = renderer(dir.path())
        .render_document(&period, &daily_rows(2), &chart(), Utc::now())
        .unwrap();

    assert_eq!(report.path, path);
    assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF-"));
}

#[test]
fn test_reports_dir_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("out").join("reports");
    let period = ReportPeriod::Month { month: 3, year: 2024 };

    let report = renderer(&nested)
        .render_document(&period, &daily_rows(1), &chart(), Utc::now())
        .unwrap();

    assert!(report.path.starts_with(&nested));
    assert!(report.path.exists());
}

#[test]
fn test_corrupt_chart_is_an_image_error() {
    let dir = tempfile::tempdir().unwrap();
    let period = ReportPeriod::Month { month: 3, year: 2024 };
    let broken = ChartImage {
        png: b"\x89PNG\r\n\x1a\nnot really".to_vec(),
    };

    let err = renderer(dir.path())
        .render_document(&period, &daily_rows(1), &broken, Utc::now())
        .unwrap_err();

    assert!(matches!(err, RenderError::ChartImage(_)));
    assert!(!dir.path().join("Rekap_3_2024.pdf").exists());
}

#[test]
fn test_concurrent_renders_of_one_period_leave_a_valid_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let period = ReportPeriod::Month { month: 3, year: 2024 };
    let rows = daily_rows(31);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let report = renderer(dir.path())
                    .render_document(&period, &rows, &chart(), Utc::now())
                    .unwrap();
                // Whatever is at the path is always a complete document
                let doc = lopdf::Document::load(&report.path).unwrap();
                assert_eq!(doc.get_pages().len(), 3);
            });
        }
    });

    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(names, vec![std::ffi::OsString::from("Rekap_3_2024.pdf")]);
}
