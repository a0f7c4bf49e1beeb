use std::io;
use thiserror::Error;

use crate::config::settings::ConfigError;
use crate::security::validator::ValidationError;

/// Errors that can occur during git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Not a git repository")]
    NotARepository,

    #[error("Failed to execute git: {0}")]
    SpawnFailed(String),

    #[error("Git command failed: {0}")]
    CommandFailed(String),

    #[error("Git command timed out after {0}s")]
    Timeout(u64),

    #[error("Git output exceeded {0} bytes")]
    OutputTooLarge(usize),

    #[error("Failed to parse git output: {0}")]
    ParseError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    #[error("Git version {0} is too old. Minimum required: 2.22")]
    GitVersionTooOld(String),

    #[error("Failed to detect git version: {0}")]
    GitVersionDetectionFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Top-level application error that wraps all module-specific errors
///
/// Used by the binary and the API layer; library operations return
/// [`GitError`] directly.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Security validation error: {0}")]
    Security(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for git operations
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Result type for application-level operations
pub type AppResult<T> = std::result::Result<T, AppError>;
