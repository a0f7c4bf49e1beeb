use crate::error::{GitError, GitResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

/// Default per-command timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on captured bytes per stream (10 MiB)
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Config overrides passed ahead of every command
///
/// User and repository config must not change the shape of output the
/// parsers read: no ANSI colors, no column layout, no signature blocks in
/// `git log`. Specific keys are pinned too since they take precedence over
/// the `*.ui` ones.
pub const OUTPUT_CONFIG: &[&str] = &[
    "color.ui=never",
    "color.branch=never",
    "color.diff=never",
    "color.status=never",
    "column.ui=never",
    "column.branch=never",
    "log.showSignature=false",
];

/// Why a git invocation did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunFailure {
    /// The process could not be started at all
    Spawn(String),
    /// The process ran and exited unsuccessfully
    Exit(i32),
    Timeout(Duration),
    OutputTooLarge(usize),
    Io(String),
}

/// Result of executing a git command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub success: bool,
    pub failure: Option<RunFailure>,
}

impl CommandOutput {
    fn failed(failure: RunFailure) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: -1,
            success: false,
            failure: Some(failure),
        }
    }

    /// Stdout, or stderr when the command wrote nothing to stdout
    ///
    /// Some git commands (`checkout`, `branch -d`) report success on stderr.
    pub fn output(&self) -> &str {
        if self.stdout.is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }

    /// Human-readable reason for the failure, if the command failed
    pub fn error_message(&self) -> Option<String> {
        let failure = self.failure.as_ref()?;

        let message = match failure {
            RunFailure::Spawn(reason) => format!("Failed to execute git: {}", reason),
            RunFailure::Exit(code) => {
                let stderr = self.stderr.trim();
                if stderr.is_empty() {
                    format!("git exited with code {}", code)
                } else {
                    stderr.to_string()
                }
            }
            RunFailure::Timeout(limit) => {
                format!("git did not finish within {}s", limit.as_secs())
            }
            RunFailure::OutputTooLarge(limit) => {
                format!("git output exceeded {} bytes", limit)
            }
            RunFailure::Io(reason) => format!("Failed to read git output: {}", reason),
        };

        Some(message)
    }

    /// Convert a failed run into the matching [`GitError`]
    pub fn into_result(self) -> GitResult<CommandOutput> {
        let Some(failure) = self.failure.clone() else {
            return Ok(self);
        };

        let message = self.error_message().unwrap_or_default();
        Err(match failure {
            RunFailure::Spawn(reason) => GitError::SpawnFailed(reason),
            RunFailure::Exit(_) | RunFailure::Io(_) => GitError::CommandFailed(message),
            RunFailure::Timeout(limit) => GitError::Timeout(limit.as_secs()),
            RunFailure::OutputTooLarge(limit) => GitError::OutputTooLarge(limit),
        })
    }
}

/// Runs git against a single working tree
///
/// Implementations never return an error for a failed command; the failure
/// is described by the returned [`CommandOutput`].
#[async_trait]
pub trait CommandRunner: Send + Sync + std::fmt::Debug {
    /// Run `git <args>` and capture its output
    async fn run(&self, args: &[&str]) -> CommandOutput;

    /// Root of the working tree commands run in
    fn repo_path(&self) -> &Path;

    /// Run `git <args>` and turn a failed run into an error
    async fn execute(&self, args: &[&str]) -> GitResult<CommandOutput> {
        self.run(args).await.into_result()
    }
}

/// Executes git commands within a repository
#[derive(Debug, Clone)]
pub struct GitExecutor {
    repo_path: PathBuf,
    timeout: Duration,
    max_output_bytes: usize,
}

impl GitExecutor {
    /// Create a new GitExecutor for the given repository path
    pub fn new<P: AsRef<Path>>(repo_path: P) -> Self {
        Self::with_limits(repo_path, DEFAULT_TIMEOUT, DEFAULT_MAX_OUTPUT_BYTES)
    }

    /// Create a GitExecutor with a custom timeout and output cap
    pub fn with_limits<P: AsRef<Path>>(
        repo_path: P,
        timeout: Duration,
        max_output_bytes: usize,
    ) -> Self {
        Self {
            repo_path: repo_path.as_ref().to_path_buf(),
            timeout,
            max_output_bytes,
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new("git");
        for setting in OUTPUT_CONFIG {
            command.arg("-c").arg(setting);
        }
        command
            .args(args)
            .current_dir(&self.repo_path)
            // Messages such as "HEAD detached at" are matched verbatim
            .env("LC_ALL", "C")
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    /// Wait for the child while draining both pipes
    async fn collect(&self, mut child: Child) -> GitResult<CommandOutput> {
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GitError::SpawnFailed("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| GitError::SpawnFailed("stderr was not captured".to_string()))?;

        let limit = self.max_output_bytes;
        let (stdout, stderr, status) = tokio::try_join!(
            read_capped(stdout, limit),
            read_capped(stderr, limit),
            async { child.wait().await.map_err(GitError::from) },
        )?;

        let exit_code = status.code().unwrap_or(-1);
        let success = status.success();

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            exit_code,
            success,
            failure: (!success).then_some(RunFailure::Exit(exit_code)),
        })
    }

    /// Get the repository path
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }
}

#[async_trait]
impl CommandRunner for GitExecutor {
    async fn run(&self, args: &[&str]) -> CommandOutput {
        let started = Instant::now();

        let child = match self.command(args).spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(?args, error = %e, "failed to spawn git");
                return CommandOutput::failed(RunFailure::Spawn(e.to_string()));
            }
        };

        // Dropping the collect future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, self.collect(child)).await {
            Ok(Ok(output)) => output,
            Ok(Err(GitError::OutputTooLarge(limit))) => {
                CommandOutput::failed(RunFailure::OutputTooLarge(limit))
            }
            Ok(Err(e)) => CommandOutput::failed(RunFailure::Io(e.to_string())),
            Err(_) => CommandOutput::failed(RunFailure::Timeout(self.timeout)),
        };

        tracing::debug!(
            ?args,
            exit_code = output.exit_code,
            success = output.success,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "git command finished"
        );

        output
    }

    fn repo_path(&self) -> &Path {
        &self.repo_path
    }
}

async fn read_capped<R: AsyncRead + Unpin>(reader: R, limit: usize) -> GitResult<Vec<u8>> {
    let mut buf = Vec::new();
    reader
        .take(limit as u64 + 1)
        .read_to_end(&mut buf)
        .await?;

    if buf.len() > limit {
        return Err(GitError::OutputTooLarge(limit));
    }

    Ok(buf)
}
