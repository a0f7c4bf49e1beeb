pub mod diff;
pub mod executor;
pub mod parser;
pub mod repository;
pub mod version;

// Re-export commonly used types
pub use diff::{DiffLine, DiffLineKind, DiffScope, DiffView, classify};
pub use executor::{CommandOutput, CommandRunner, GitExecutor, RunFailure};
pub use parser::{
    Branch, BranchKind, Commit, FileState, StatusCategory, StatusEntry, WorkingTreeStatus,
    parse_branch_list, parse_log, parse_status_porcelain,
};
pub use repository::{
    DEFAULT_COMMIT_LIMIT, DEFAULT_FILE_HISTORY_LIMIT, DeleteOutcome, Repository, parse_limit,
};
pub use version::GitVersion;
