#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sensor_monitor_service::config::{ApiConfig, BotConfig, Config};
use sensor_monitor_service::db::{MemoryStore, Reading, SharedStore};

pub const TEST_TOKEN: &str = "MyApiToken123!";
pub const TEST_WEBHOOK_TOKEN: &str = "bot-secret";

pub fn common_config(log_dir: &Path) -> Config {
    Config {
        database_url: "postgres://localhost/sensor_test".to_string(),
        log_dir: log_dir.to_path_buf(),
        utc_offset_hours: 7,
        timezone_label: "WIB".to_string(),
    }
}

pub fn api_config(log_dir: &Path) -> ApiConfig {
    ApiConfig {
        common: common_config(log_dir),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        api_token: TEST_TOKEN.to_string(),
    }
}

pub fn bot_config(work_dir: &Path, chart_service_url: &str) -> BotConfig {
    BotConfig {
        common: common_config(&work_dir.join("logs")),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        webhook_token: Some(TEST_WEBHOOK_TOKEN.to_string()),
        reports_dir: work_dir.join("reports"),
        chart_service_url: chart_service_url.to_string(),
        chart_timeout_secs: 5,
        dashboard_url: None,
    }
}

pub fn reading(timestamp: DateTime<Utc>, ph_in: f64, temp_in: f64) -> Reading {
    Reading {
        ph_in,
        ph_out: 7.0,
        temp_in,
        temp_out: 27.0,
        timestamp,
    }
}

/// Memory store plus the same store as the trait object the app takes
pub fn memory_store(readings: Vec<Reading>) -> (Arc<MemoryStore>, SharedStore) {
    let store = Arc::new(MemoryStore::with_readings(readings));
    let shared: SharedStore = store.clone();
    (store, shared)
}

/// Small opaque PNG standing in for the chart service output
pub fn tiny_png() -> Vec<u8> {
    let (width, height) = (4u32, 2u32);
    let mut bytes = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut bytes, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().expect("png header");
        let pixels: Vec<u8> = (0..width * height)
            .flat_map(|i| [(i * 30) as u8, 120, 200])
            .collect();
        writer.write_image_data(&pixels).expect("png data");
    }
    bytes
}

pub fn read_log(dir: &Path, file: &str) -> String {
    std::fs::read_to_string(dir.join(file)).unwrap_or_default()
}
