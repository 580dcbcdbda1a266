use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use tokio::time;
use tracing::{debug, error, info, instrument};

use crate::backup::BackupJob;

/// First instant strictly after `now` whose local wall-clock time is `at`
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    let local_date = now.with_timezone(&offset).date_naive();
    let local_run = local_date.and_time(at);
    let utc_run = local_run - Duration::seconds(offset.local_minus_utc() as i64);
    let candidate = DateTime::<Utc>::from_naive_utc_and_offset(utc_run, Utc);

    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(1)
    }
}

/// Run the backup once a day at `at` local time, forever
#[instrument(skip(job))]
pub async fn start_backup_scheduler(job: BackupJob, at: NaiveTime) {
    info!("Backup scheduler started, daily at {}", at.format("%H:%M"));

    loop {
        let now = Utc::now();
        let next = next_run_after(now, at, job.offset());
        let wait = (next - now).to_std().unwrap_or_default();
        debug!("Next backup at {} (in {:?})", next, wait);
        time::sleep(wait).await;

        match job.run().await {
            Ok(artifact) => {
                info!(
                    "Scheduled backup stored {} ({:.2} MB)",
                    artifact.path.display(),
                    artifact.size_mb()
                );
            }
            Err(e) => {
                error!("Scheduled backup failed: {}", e);
            }
        }
    }
}
