use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::info;

use sensor_monitor_service::app::{bot_router, build_dispatcher, Application};
use sensor_monitor_service::bot::console::run_console;
use sensor_monitor_service::config::BotConfig;
use sensor_monitor_service::db::{self, ReadingRepository, SharedStore};

#[derive(Parser)]
#[command(name = "sensor-bot")]
#[command(about = "Chat command bot for IPAL sensor status and PDF reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Receive messages from the messaging gateway over HTTP
    Serve,
    /// Read commands from stdin and print replies to stdout
    Console,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if it exists (ignore errors if not found)
    let _ = dotenvy::dotenv();

    // Logs go to stderr so console replies stay readable on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = BotConfig::from_env()?;

    let pool = db::connect(&config.common.database_url, 5).await?;
    let store: SharedStore = Arc::new(ReadingRepository::new(pool.clone()));
    let dispatcher = build_dispatcher(&config, store);

    match cli.mode {
        Mode::Serve => {
            let token = config
                .webhook_token
                .clone()
                .ok_or("BOT_WEBHOOK_TOKEN is required for serve mode")?;
            let app =
                Application::serve(&config.server_addr(), bot_router(&config, dispatcher, token))
                    .await?;
            info!("Bot webhook listening on {}", app.local_addr);
            app.run_until_stopped().await?;
        }
        Mode::Console => {
            info!("Bot console ready, type !menu");
            run_console(&dispatcher, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                .await?;
        }
    }

    pool.close().await;
    Ok(())
}
