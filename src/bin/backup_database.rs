use clap::Parser;
use tracing::{error, info};

use sensor_monitor_service::backup::BackupJob;
use sensor_monitor_service::config::BackupConfig;
use sensor_monitor_service::scheduler;

#[derive(Parser)]
#[command(name = "backup-database")]
#[command(about = "Dump the sensor database into a timestamped archive", long_about = None)]
struct Cli {
    /// Keep running and back up once a day at BACKUP_HOUR:BACKUP_MINUTE local time
    #[arg(long)]
    daily: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = BackupConfig::from_env()?;
    let job = BackupJob::new(&config);

    if cli.daily {
        scheduler::start_backup_scheduler(job, config.daily_at()).await;
        return Ok(());
    }

    match job.run().await {
        Ok(artifact) => {
            info!(
                "✅ Backup stored at {} ({:.2} MB)",
                artifact.path.display(),
                artifact.size_mb()
            );
            Ok(())
        }
        Err(e) => {
            error!("Backup failed: {}", e);
            Err(e.into())
        }
    }
}
