//! JSON envelopes returned by the HTTP API
//!
//! Every response carries a `success` flag; failures carry a `message`
//! instead of an HTTP error status.

use serde::{Deserialize, Serialize};

use crate::error::GitError;
use crate::error_translation::ErrorTranslator;
use crate::git::{Branch, Commit, DiffLine, WorkingTreeStatus};

/// Human-readable failure text plus an optional hint for the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub message: String,
    pub hint: Option<String>,
}

impl From<&GitError> for Failure {
    fn from(error: &GitError) -> Self {
        let translated = ErrorTranslator::translate(error);
        let message = translated.message().to_string();

        let hint = match translated.suggestion {
            Some(suggestion) => Some(format!("{} {}", translated.simple_message, suggestion)),
            None if translated.simple_message != message => Some(translated.simple_message),
            None => None,
        };

        Self { message, hint }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            hint: None,
        }
    }

    pub fn failed(failure: Failure) -> Self {
        Self {
            success: false,
            message: failure.message,
            hint: failure.hint,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CurrentBranchResponse {
    pub success: bool,
    /// Empty while HEAD is detached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub detached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BranchesResponse {
    pub success: bool,
    pub branches: Vec<Branch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Commit listings always report success; a failed query yields no commits
#[derive(Debug, Serialize, PartialEq)]
pub struct CommitsResponse {
    pub success: bool,
    pub commits: Vec<Commit>,
}

impl CommitsResponse {
    pub fn new(commits: Vec<Commit>) -> Self {
        Self {
            success: true,
            commits,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum StatusBody {
    Status(WorkingTreeStatus),
    /// Serialized as `{}`
    Unavailable {},
}

#[derive(Debug, Serialize, PartialEq)]
pub struct StatusResponse {
    pub success: bool,
    pub status: StatusBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DiffResponse {
    pub success: bool,
    /// Raw diff text as printed by git
    pub diff: String,
    pub lines: Vec<DiffLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub repo_path: String,
}

/// Body of the branch mutation endpoints
#[derive(Debug, Deserialize, Default)]
pub struct BranchRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct LimitQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DiffQuery {
    #[serde(rename = "type")]
    pub scope: Option<String>,
    pub file: Option<String>,
}
