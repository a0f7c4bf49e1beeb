use crate::audit::AuditLogger;
use crate::error::{GitError, GitResult};
use crate::git::diff::{DiffScope, DiffView};
use crate::git::executor::{CommandOutput, CommandRunner, GitExecutor, RunFailure};
use crate::git::parser::{self, Branch, Commit, WorkingTreeStatus};
use crate::security::{InputValidator, ValidationError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Commits returned by [`Repository::commits`] when no usable limit is given
pub const DEFAULT_COMMIT_LIMIT: usize = 20;

/// Commits returned by [`Repository::file_history`] when no usable limit is given
pub const DEFAULT_FILE_HISTORY_LIMIT: usize = 10;

/// Parse a caller-supplied commit limit
///
/// Anything that is not a positive integer falls back to `default`.
pub fn parse_limit(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|&limit| limit > 0)
        .unwrap_or(default)
}

/// How a branch deletion went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// `git branch -d` succeeded
    Deleted,
    /// `git branch -d` refused and `git branch -D` succeeded
    ForceDeleted,
}

/// A git working tree and the queries and branch mutations exposed on it
///
/// Mutations hold the write side of a per-repository lock for as long as
/// their git processes run; queries share the read side.
#[derive(Debug)]
pub struct Repository {
    path: PathBuf,
    runner: Arc<dyn CommandRunner>,
    lock: RwLock<()>,
    validator: InputValidator,
    audit: Option<AuditLogger>,
}

impl Repository {
    /// Detect git repository starting from a specific directory
    pub fn discover_from<P: AsRef<Path>>(start_path: P) -> GitResult<Self> {
        Ok(Self::new(Self::find_root(start_path)?))
    }

    /// Walk up from `start_path` to the directory holding `.git`
    ///
    /// `.git` may be a file when the tree is a linked worktree or submodule.
    pub fn find_root<P: AsRef<Path>>(start_path: P) -> GitResult<PathBuf> {
        let mut current = start_path.as_ref().to_path_buf();

        loop {
            if current.join(".git").exists() {
                return Ok(current);
            }

            // Move up to parent directory
            if !current.pop() {
                return Err(GitError::NotARepository);
            }
        }
    }

    /// Create a Repository for a known git directory
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_runner(Arc::new(GitExecutor::new(path)))
    }

    /// Create a Repository that runs git through `runner`
    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            path: runner.repo_path().to_path_buf(),
            runner,
            lock: RwLock::new(()),
            validator: InputValidator::new(),
            audit: None,
        }
    }

    /// Record mutations in `logger`
    pub fn with_audit_log(mut self, logger: AuditLogger) -> Self {
        self.audit = Some(logger);
        self
    }

    /// Get the repository path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name of the checked-out branch, `None` when HEAD is detached
    pub async fn current_branch(&self) -> GitResult<Option<String>> {
        let _guard = self.lock.read().await;

        let output = self.runner.execute(&["branch", "--show-current"]).await?;
        let branch = output.stdout.trim();

        Ok((!branch.is_empty()).then(|| branch.to_string()))
    }

    /// Local and remote-tracking branches
    pub async fn list_branches(&self) -> GitResult<Vec<Branch>> {
        let _guard = self.lock.read().await;

        let output = self.runner.execute(&["branch", "-a"]).await?;
        parser::parse_branch_list(&output.stdout)
    }

    pub async fn create_branch(&self, name: &str) -> GitResult<()> {
        let name = self.validate_branch_name("create_branch", name)?;
        let _guard = self.lock.write().await;

        self.mutate(&["branch", name]).await?.into_result()?;
        tracing::info!(branch = name, "created branch");
        Ok(())
    }

    pub async fn checkout_branch(&self, name: &str) -> GitResult<()> {
        let name = self.validate_branch_name("checkout_branch", name)?;
        let _guard = self.lock.write().await;

        // Trailing `--` keeps git from reading the name as a path
        self.mutate(&["checkout", name, "--"]).await?.into_result()?;
        tracing::info!(branch = name, "checked out branch");
        Ok(())
    }

    /// Delete a branch, forcing the delete if git refuses a safe one
    ///
    /// When the forced delete also fails its error is returned.
    pub async fn delete_branch(&self, name: &str) -> GitResult<DeleteOutcome> {
        let name = self.validate_branch_name("delete_branch", name)?;
        let _guard = self.lock.write().await;

        let safe = self.mutate(&["branch", "-d", name]).await?;
        if safe.success {
            tracing::info!(branch = name, "deleted branch");
            return Ok(DeleteOutcome::Deleted);
        }

        let reason = safe.error_message().unwrap_or_default();
        tracing::info!(branch = name, %reason, "safe delete refused, forcing");

        self.mutate(&["branch", "-D", name]).await?.into_result()?;
        tracing::info!(branch = name, "force deleted branch");
        Ok(DeleteOutcome::ForceDeleted)
    }

    /// Most recent commits on HEAD, newest first
    ///
    /// A `limit` of 0 means [`DEFAULT_COMMIT_LIMIT`]. A branch without
    /// commits yields an empty list.
    pub async fn commits(&self, limit: usize) -> GitResult<Vec<Commit>> {
        let limit = if limit == 0 { DEFAULT_COMMIT_LIMIT } else { limit };
        self.log(limit, None).await
    }

    /// Most recent commits touching `path`, newest first
    pub async fn file_history(&self, path: &str, limit: usize) -> GitResult<Vec<Commit>> {
        let path = self.validator.validate_path(path)?;
        let limit = if limit == 0 {
            DEFAULT_FILE_HISTORY_LIMIT
        } else {
            limit
        };
        self.log(limit, Some(path)).await
    }

    async fn log(&self, limit: usize, path: Option<&str>) -> GitResult<Vec<Commit>> {
        let limit_arg = limit.to_string();
        let mut args = vec![
            "log",
            "-n",
            limit_arg.as_str(),
            "--date=iso-strict",
            parser::LOG_FORMAT,
        ];
        if let Some(path) = path {
            args.extend(["--", path]);
        }

        let _guard = self.lock.read().await;
        let output = self.runner.run(&args).await;

        if !output.success {
            // Unborn branches make `git log` fail; there is simply no history
            let reason = output.error_message().unwrap_or_default();
            tracing::debug!(%reason, "git log failed, returning no commits");
            return Ok(Vec::new());
        }

        let mut commits = parser::parse_log(&output.stdout)?;
        commits.truncate(limit);
        Ok(commits)
    }

    /// Staged, modified, untracked and deleted files
    pub async fn status(&self) -> GitResult<WorkingTreeStatus> {
        let _guard = self.lock.read().await;

        let output = self.runner.execute(&["status", "--porcelain", "-z"]).await?;
        let entries = parser::parse_status_porcelain(&output.stdout)?;

        Ok(WorkingTreeStatus::from_entries(entries))
    }

    /// Diff for `scope`, optionally narrowed to one path
    pub async fn diff(&self, scope: DiffScope, path: Option<&str>) -> GitResult<DiffView> {
        let path = path.map(|p| self.validator.validate_path(p)).transpose()?;

        // An external diff driver would replace the unified format
        let mut args = vec!["diff", "--no-ext-diff"];
        args.extend_from_slice(scope.args());
        if let Some(path) = path {
            args.extend(["--", path]);
        }

        let _guard = self.lock.read().await;
        let output = self.runner.execute(&args).await?;

        Ok(DiffView::new(scope, path.map(str::to_string), output.stdout))
    }

    fn validate_branch_name<'a>(&self, operation: &str, name: &'a str) -> GitResult<&'a str> {
        self.validator.validate_branch_name(name).map_err(|e| {
            self.audit_rejected(operation, name, &e);
            GitError::from(e)
        })
    }

    /// Run a mutating command and record it in the audit log
    ///
    /// A spawn failure is returned as an error; any other outcome is
    /// returned for the caller to inspect.
    async fn mutate(&self, args: &[&str]) -> GitResult<CommandOutput> {
        let output = self.runner.run(args).await;

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_command(args, &self.path, output.exit_code) {
                tracing::warn!(error = %e, "failed to write audit log");
            }
        }

        if matches!(output.failure, Some(RunFailure::Spawn(_))) {
            return output.into_result();
        }

        Ok(output)
    }

    fn audit_rejected(&self, operation: &str, input: &str, error: &ValidationError) {
        tracing::warn!(operation, input, error = %error, "rejected branch name");

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.log_rejected(operation, input, &error.to_string(), &self.path) {
                tracing::warn!(error = %e, "failed to write audit log");
            }
        }
    }
}
