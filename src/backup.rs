use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use percent_encoding::percent_decode_str;
use reqwest::Url;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::config::BackupConfig;

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {status}: {stderr}")]
    DumpFailed {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("Backup file {0} was not created")]
    MissingArchive(PathBuf),
    #[error("Backup file {0} is empty")]
    EmptyArchive(PathBuf),
    #[error("Backup directory error: {0}")]
    Io(#[from] io::Error),
}

/// A verified dump on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupArtifact {
    pub path: PathBuf,
    pub byte_size: u64,
}

impl BackupArtifact {
    pub fn size_mb(&self) -> f64 {
        self.byte_size as f64 / 1024.0 / 1024.0
    }
}

/// Shells out to the dump utility and checks what it wrote
#[derive(Clone)]
pub struct BackupJob {
    database_url: String,
    backup_dir: PathBuf,
    dump_program: String,
    offset: FixedOffset,
}

impl BackupJob {
    pub fn new(config: &BackupConfig) -> Self {
        Self {
            database_url: config.common.database_url.clone(),
            backup_dir: config.backup_dir.clone(),
            dump_program: config.dump_program.clone(),
            offset: config.common.utc_offset(),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// `<backup_dir>/backup_<db>_<YYYY-MM-DD_HH-mm-ss>.sql` in local time
    pub fn archive_path(&self, now: DateTime<Utc>) -> PathBuf {
        let stamp = now.with_timezone(&self.offset).format("%Y-%m-%d_%H-%M-%S");
        self.backup_dir.join(format!(
            "backup_{}_{}.sql",
            database_name(&self.database_url),
            stamp
        ))
    }

    #[instrument(skip(self), fields(program = %self.dump_program))]
    pub async fn run(&self) -> Result<BackupArtifact, BackupError> {
        tokio::fs::create_dir_all(&self.backup_dir).await?;
        let path = self.archive_path(Utc::now());
        info!(
            "Creating database backup of {} into {}",
            database_name(&self.database_url),
            path.display()
        );

        // The password travels in the environment, not the process arguments
        let (dbname, password) = split_password(&self.database_url);
        let mut command = Command::new(&self.dump_program);
        command
            .arg(format!("--dbname={}", dbname))
            .arg(format!("--file={}", path.display()));
        if let Some(password) = password {
            command.env("PGPASSWORD", password);
        }

        let output = command
            .output()
            .await
            .map_err(|source| BackupError::Spawn {
                program: self.dump_program.clone(),
                source,
            })?;

        if !output.status.success() {
            discard_partial(&path).await;
            return Err(BackupError::DumpFailed {
                program: self.dump_program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        debug!("{} finished successfully", self.dump_program);

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BackupError::MissingArchive(path))
            }
            Err(e) => return Err(e.into()),
        };
        if metadata.len() == 0 {
            discard_partial(&path).await;
            return Err(BackupError::EmptyArchive(path));
        }

        let artifact = BackupArtifact {
            path,
            byte_size: metadata.len(),
        };
        info!(
            "Backup success: {} ({:.2} MB)",
            artifact.path.display(),
            artifact.size_mb()
        );
        Ok(artifact)
    }
}

async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial backup {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => debug!("Could not remove partial backup {}: {}", path.display(), e),
    }
}

/// Connection URL without its password, plus the decoded password
///
/// URLs that do not parse are passed through unchanged.
pub fn split_password(database_url: &str) -> (String, Option<String>) {
    let Ok(mut url) = Url::parse(database_url) else {
        return (database_url.to_string(), None);
    };
    let password = url
        .password()
        .map(|encoded| percent_decode_str(encoded).decode_utf8_lossy().into_owned());
    if password.is_some() && url.set_password(None).is_err() {
        return (database_url.to_string(), None);
    }
    (url.to_string(), password)
}

/// Database name from a connection URL, e.g. `postgres://u:p@host/sensor_bot?sslmode=require`
pub fn database_name(database_url: &str) -> String {
    database_url
        .split('?')
        .next()
        .and_then(|base| base.rsplit('/').next())
        .filter(|name| !name.is_empty() && !name.contains(':') && !name.contains('@'))
        .unwrap_or("database")
        .to_string()
}
