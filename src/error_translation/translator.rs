use crate::error::{AppError, GitError};

#[derive(Debug, Clone)]
pub struct UserFriendlyError {
    pub simple_message: String,
    pub suggestion: Option<String>,
    pub raw_error: String,
}

impl UserFriendlyError {
    /// Message shown to API callers
    ///
    /// Git's own text is kept when git produced one; failures that never
    /// reached git get the generic message.
    pub fn message(&self) -> &str {
        if self.raw_error.is_empty() {
            &self.simple_message
        } else {
            &self.raw_error
        }
    }
}

pub struct ErrorTranslator;

impl ErrorTranslator {
    /// Translate an AppError into a user-friendly error message
    pub fn translate_app_error(error: &AppError) -> UserFriendlyError {
        match error {
            AppError::Git(git_err) => Self::translate(git_err),
            AppError::Config(config_err) => UserFriendlyError {
                simple_message: "Configuration error occurred.".to_string(),
                suggestion: Some(
                    "Check your config file at ~/.config/gitboard/config.toml".to_string(),
                ),
                raw_error: config_err.to_string(),
            },
            AppError::Security(sec_err) => UserFriendlyError {
                simple_message: "Request rejected by input validation.".to_string(),
                suggestion: None,
                raw_error: sec_err.to_string(),
            },
            AppError::Io(io_err) => UserFriendlyError {
                simple_message: "I/O error occurred.".to_string(),
                suggestion: Some("Check file permissions and disk space".to_string()),
                raw_error: io_err.to_string(),
            },
        }
    }

    /// Translate a GitError into a user-friendly error message
    pub fn translate(error: &GitError) -> UserFriendlyError {
        match error {
            // Spawn failures never reach git, so there is no git text to show
            GitError::SpawnFailed(_) | GitError::IoError(_) => UserFriendlyError {
                simple_message: "Failed to run git.".to_string(),
                suggestion: Some("Check that git is installed and on PATH".to_string()),
                raw_error: String::new(),
            },
            GitError::Timeout(secs) => UserFriendlyError {
                simple_message: format!("Git did not respond within {}s.", secs),
                suggestion: Some("Raise git.timeout_seconds in the config".to_string()),
                raw_error: error.to_string(),
            },
            GitError::OutputTooLarge(_) => UserFriendlyError {
                simple_message: "Git output was too large to return.".to_string(),
                suggestion: Some("Narrow the request to a single file".to_string()),
                raw_error: error.to_string(),
            },
            GitError::InvalidInput(validation) => UserFriendlyError {
                simple_message: validation.to_string(),
                suggestion: None,
                raw_error: validation.to_string(),
            },
            GitError::CommandFailed(stderr) => {
                let (simple_message, suggestion) = Self::match_error_patterns(stderr);
                UserFriendlyError {
                    simple_message,
                    suggestion,
                    raw_error: stderr.clone(),
                }
            }
            _ => {
                let raw_error = error.to_string();
                let (simple_message, suggestion) = Self::match_error_patterns(&raw_error);
                UserFriendlyError {
                    simple_message,
                    suggestion,
                    raw_error,
                }
            }
        }
    }

    /// Match common git error patterns and provide user-friendly messages
    fn match_error_patterns(error_text: &str) -> (String, Option<String>) {
        let lower = error_text.to_lowercase();

        // Branch already exists
        if lower.contains("already exists") && (lower.contains("branch") || lower.contains("ref")) {
            return (
                "A branch with that name already exists.".to_string(),
                Some("Use a different name or delete the existing branch first.".to_string()),
            );
        }

        // Deleting the checked-out branch
        if lower.contains("cannot delete") && (lower.contains("checked out") || lower.contains("currently on")) {
            return (
                "Cannot delete the branch that is currently checked out.".to_string(),
                Some("Check out another branch first.".to_string()),
            );
        }

        // Checkout or delete of a missing branch
        if (lower.contains("pathspec") && lower.contains("did not match"))
            || (lower.contains("branch") && lower.contains("not found"))
        {
            return (
                "Branch not found in the repository.".to_string(),
                Some("List branches to see the available names.".to_string()),
            );
        }

        // Invalid ref name that slipped past local validation
        if lower.contains("is not a valid branch name") {
            return (
                "That is not a valid branch name.".to_string(),
                None,
            );
        }

        // Uncommitted changes
        if lower.contains("would be overwritten") {
            return (
                "Checkout would overwrite uncommitted changes.".to_string(),
                Some("Commit or stash your changes first.".to_string()),
            );
        }

        // Nothing to start a branch from
        if lower.contains("not a valid object name")
            || lower.contains("does not have any commits")
            || lower.contains("bad revision 'head'")
            || (lower.contains("ambiguous argument 'head'"))
        {
            return (
                "The repository has no commits yet.".to_string(),
                Some("Create a first commit before branching or diffing against HEAD.".to_string()),
            );
        }

        // Not a git repository
        if lower.contains("not a git repository") {
            return (
                "The configured path is not a git repository.".to_string(),
                Some("Set repository.path or GIT_REPO_PATH to a working tree.".to_string()),
            );
        }

        // Conflicted index
        if lower.contains("resolve your current index first") || lower.contains("unmerged") {
            return (
                "The index has unresolved conflicts.".to_string(),
                Some("Resolve the conflicts before switching branches.".to_string()),
            );
        }

        // Default: return the error as-is with no suggestion
        (error_text.to_string(), None)
    }
}
