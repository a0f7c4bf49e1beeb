use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::LoggingConfig;

pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// Append-only record of working-tree mutations
///
/// One line per mutating git command (branch create, checkout, delete) and
/// per rejected mutation request.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    log_path: PathBuf,
    max_size: u64,
}

impl AuditLogger {
    /// Open the audit log described by the `[logging]` config section
    ///
    /// Returns `None` when auditing is off, or when no path is configured
    /// and there is no `home` to place the default log under.
    pub fn from_config(logging: &LoggingConfig, home: Option<&Path>) -> std::io::Result<Option<Self>> {
        if !logging.audit_log {
            return Ok(None);
        }

        let path = match (&logging.audit_log_path, home) {
            (Some(path), _) => path.clone(),
            (None, Some(home)) => Self::default_log_path(home),
            (None, None) => {
                tracing::warn!("HOME is not set and no audit_log_path is configured, audit log disabled");
                return Ok(None);
            }
        };

        Self::with_path(path).map(Some)
    }

    /// Create an AuditLogger with a custom log path
    pub fn with_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let log_path = path.as_ref().to_path_buf();

        // Ensure directory exists
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self {
            log_path,
            max_size: MAX_LOG_SIZE,
        })
    }

    /// Rotate once the log grows past `max_size` bytes
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Default log path under `home`: ~/.config/gitboard/audit.log
    pub fn default_log_path(home: &Path) -> PathBuf {
        home.join(".config").join("gitboard").join("audit.log")
    }

    /// Log a git command that mutated (or tried to mutate) the working tree
    pub fn log_command(&self, args: &[&str], repo_path: &Path, exit_code: i32) -> std::io::Result<()> {
        self.append(format!(
            "[{}] [{}] [exit:{}] git {}\n",
            Utc::now().to_rfc3339(),
            repo_path.display(),
            exit_code,
            args.join(" ")
        ))
    }

    /// Log a mutation request refused before git was spawned
    pub fn log_rejected(
        &self,
        operation: &str,
        input: &str,
        reason: &str,
        repo_path: &Path,
    ) -> std::io::Result<()> {
        // Debug formatting keeps caller-supplied newlines from forging entries
        self.append(format!(
            "[{}] [{}] [REJECTED] op={} input={:?} reason={:?}\n",
            Utc::now().to_rfc3339(),
            repo_path.display(),
            operation,
            input,
            reason
        ))
    }

    fn append(&self, entry: String) -> std::io::Result<()> {
        self.rotate_if_needed()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        file.write_all(entry.as_bytes())?;
        file.flush()
    }

    /// Rotate log file if it exceeds the size limit
    fn rotate_if_needed(&self) -> std::io::Result<()> {
        if !self.log_path.exists() {
            return Ok(());
        }

        let metadata = fs::metadata(&self.log_path)?;
        if metadata.len() > self.max_size {
            // Rotate: audit.log -> audit.log.1
            let backup_path = self.log_path.with_extension("log.1");
            fs::rename(&self.log_path, backup_path)?;
        }

        Ok(())
    }

    /// Get the path to the log file
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}
