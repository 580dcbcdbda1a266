use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Which append-only file an event line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditFile {
    Access,
    Error,
}

impl AuditFile {
    fn file_name(self) -> &'static str {
        match self {
            AuditFile::Access => "access.log",
            AuditFile::Error => "api_err.log",
        }
    }
}

/// Plaintext event log, one `field=value` line per event.
///
/// Runs next to `tracing` output: tracing goes to stdout for the process
/// supervisor, these files are kept for operators grepping past incidents.
#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, file: AuditFile) -> PathBuf {
        self.dir.join(file.file_name())
    }

    /// Append one line; write failures are logged, not returned
    pub async fn append(&self, file: AuditFile, line: &str) {
        if let Err(e) = self.try_append(file, line).await {
            warn!(
                "Failed to write audit line to {}: {}",
                self.path(file).display(),
                e
            );
        }
    }

    async fn try_append(&self, file: AuditFile, line: &str) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut handle = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(file))
            .await?;

        let mut entry = single_line(line);
        entry.push('\n');
        handle.write_all(entry.as_bytes()).await?;
        handle.flush().await
    }
}

/// Escape control characters so caller-supplied values cannot start a new line
pub fn single_line(line: &str) -> String {
    let mut escaped = String::with_capacity(line.len());
    for c in line.trim_end().chars() {
        if c.is_control() {
            escaped.extend(c.escape_default());
        } else {
            escaped.push(c);
        }
    }
    escaped
}
