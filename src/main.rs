use std::sync::Arc;

use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sensor_monitor_service::app::{api_router, Application};
use sensor_monitor_service::config::ApiConfig;
use sensor_monitor_service::db::{self, ReadingRepository, SharedStore};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sensor_monitor_service=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .init();

    let config = ApiConfig::from_env()?;
    info!("Starting sensor API with config: {:?}", config);

    let pool = db::connect(&config.common.database_url, 5).await?;
    let store: SharedStore = Arc::new(ReadingRepository::new(pool.clone()));

    let app = Application::serve(&config.server_addr(), api_router(&config, store)).await?;
    info!("Server listening on {}", app.local_addr);
    app.run_until_stopped().await?;

    pool.close().await;
    info!("Sensor API stopped");
    Ok(())
}
