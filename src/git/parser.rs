use crate::error::{GitError, GitResult};
use serde::Serialize;
use std::collections::BTreeSet;

/// `git log` pretty format matching [`parse_log`]: NUL-separated fields, one commit per line
pub const LOG_FORMAT: &str = "--pretty=format:%H%x00%an%x00%ae%x00%ad%x00%s";

/// Length of the abbreviated hash exposed alongside the full one
pub const SHORT_HASH_LEN: usize = 8;

/// Parse `git branch -a` output
///
/// Lines look like `* main`, `  feature-x`, `  remotes/origin/main` or, when
/// HEAD is detached, `* (HEAD detached at 1a2b3c4)`.
pub fn parse_branch_list(output: &str) -> GitResult<Vec<Branch>> {
    let mut branches = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        // '+' marks a branch checked out in another worktree
        let (is_current, entry) = match line.as_bytes()[0] {
            b'*' => (true, &line[1..]),
            b'+' => (false, &line[1..]),
            _ => (false, line),
        };
        let entry = entry.trim();

        if let Some(marker) = is_current.then(|| detached_marker(entry)).flatten() {
            branches.push(Branch {
                name: marker.to_string(),
                is_current,
                kind: BranchKind::Detached,
                remote: None,
            });
            continue;
        }

        if let Some(remote_ref) = entry.strip_prefix("remotes/") {
            // `remotes/origin/HEAD -> origin/main` is an alias, not a branch
            if remote_ref.contains(" -> ") {
                continue;
            }

            let branch = match remote_ref.split_once('/') {
                Some((remote, name)) if !remote.is_empty() && !name.is_empty() => Branch {
                    name: name.to_string(),
                    is_current,
                    kind: BranchKind::Remote,
                    remote: Some(remote.to_string()),
                },
                _ => {
                    return Err(GitError::ParseError(format!(
                        "Unexpected remote branch entry: {}",
                        entry
                    )));
                }
            };
            branches.push(branch);
            continue;
        }

        branches.push(Branch {
            name: entry.to_string(),
            is_current,
            kind: BranchKind::Local,
            remote: None,
        });
    }

    Ok(branches)
}

/// Text git prints on the `*` line instead of a branch name when HEAD is
/// not on a branch
///
/// Branch names may themselves contain parentheses, so only the known
/// marker texts count.
fn detached_marker(entry: &str) -> Option<&str> {
    let marker = entry.strip_prefix('(')?.strip_suffix(')')?;
    let known = marker.starts_with("HEAD detached at ")
        || marker.starts_with("HEAD detached from ")
        || marker == "no branch"
        || marker.starts_with("no branch, ");

    known.then_some(marker)
}

/// Parse `git log` output produced with [`LOG_FORMAT`]
///
/// Each line carries hash, author name, author email, date and subject. The
/// subject is everything after the fourth separator.
pub fn parse_log(output: &str) -> GitResult<Vec<Commit>> {
    let mut commits = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.splitn(5, '\0');
        let (Some(hash), Some(author_name), Some(author_email), Some(date)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(GitError::ParseError(format!(
                "Expected at least 4 fields in log record: {:?}",
                line
            )));
        };
        let message = fields.next().unwrap_or_default();

        if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(GitError::ParseError(format!("Invalid commit hash: {:?}", hash)));
        }

        commits.push(Commit::new(hash, author_name, author_email, date, message));
    }

    Ok(commits)
}

/// Parse `git status --porcelain -z` output
///
/// Records are NUL-terminated and start with a two-character `XY` code, a
/// space and the path. Renames and copies are followed by an extra record
/// holding the original path.
pub fn parse_status_porcelain(output: &str) -> GitResult<Vec<StatusEntry>> {
    let mut entries = Vec::new();
    let mut records = output.split('\0');

    while let Some(record) = records.next() {
        if record.trim().is_empty() {
            continue;
        }

        let (Some(code), Some(path)) = (record.get(..2), record.get(3..)) else {
            return Err(GitError::ParseError(format!(
                "Malformed status record: {:?}",
                record
            )));
        };
        if path.is_empty() {
            return Err(GitError::ParseError(format!(
                "Status record without a path: {:?}",
                record
            )));
        }

        let mut chars = code.chars();
        let index = chars.next().map(FileState::from_code).transpose()?;
        let worktree = chars.next().map(FileState::from_code).transpose()?;
        let (Some(index), Some(worktree)) = (index, worktree) else {
            return Err(GitError::ParseError(format!("Malformed status code: {:?}", code)));
        };

        let original_path = if index.has_source_path() || worktree.has_source_path() {
            match records.next() {
                Some(source) if !source.is_empty() => Some(source.to_string()),
                _ => {
                    return Err(GitError::ParseError(format!(
                        "Rename of {:?} is missing its original path",
                        path
                    )));
                }
            }
        } else {
            None
        };

        entries.push(StatusEntry {
            path: path.to_string(),
            original_path,
            index,
            worktree,
        });
    }

    Ok(entries)
}

/// Branch kind as listed by `git branch -a`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BranchKind {
    Local,
    Remote,
    /// Placeholder line printed while HEAD is detached
    Detached,
}

/// Represents a branch from git branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    pub name: String,
    #[serde(rename = "current")]
    pub is_current: bool,
    pub kind: BranchKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

/// Represents a commit from git log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    #[serde(rename = "hash")]
    pub short_hash: String,
    pub full_hash: String,
    /// `Name <email>`
    pub author: String,
    pub author_name: String,
    pub author_email: String,
    pub date: String,
    pub message: String,
}

impl Commit {
    pub fn new(
        full_hash: &str,
        author_name: &str,
        author_email: &str,
        date: &str,
        message: &str,
    ) -> Self {
        let short_hash = full_hash.get(..SHORT_HASH_LEN).unwrap_or(full_hash);

        Self {
            short_hash: short_hash.to_string(),
            full_hash: full_hash.to_string(),
            author: format!("{} <{}>", author_name, author_email),
            author_name: author_name.to_string(),
            author_email: author_email.to_string(),
            date: date.to_string(),
            message: message.to_string(),
        }
    }
}

/// State of one side (index or worktree) of a porcelain status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Unmodified,
    Modified,
    TypeChanged,
    Added,
    Deleted,
    Renamed,
    Copied,
    Unmerged,
    Untracked,
    Ignored,
}

impl FileState {
    pub fn from_code(code: char) -> GitResult<Self> {
        Ok(match code {
            ' ' | '.' => FileState::Unmodified,
            'M' => FileState::Modified,
            'T' => FileState::TypeChanged,
            'A' => FileState::Added,
            'D' => FileState::Deleted,
            'R' => FileState::Renamed,
            'C' => FileState::Copied,
            'U' => FileState::Unmerged,
            '?' => FileState::Untracked,
            '!' => FileState::Ignored,
            other => {
                return Err(GitError::ParseError(format!(
                    "Unknown status code character: {:?}",
                    other
                )));
            }
        })
    }

    pub fn code(self) -> char {
        match self {
            FileState::Unmodified => ' ',
            FileState::Modified => 'M',
            FileState::TypeChanged => 'T',
            FileState::Added => 'A',
            FileState::Deleted => 'D',
            FileState::Renamed => 'R',
            FileState::Copied => 'C',
            FileState::Unmerged => 'U',
            FileState::Untracked => '?',
            FileState::Ignored => '!',
        }
    }

    fn has_source_path(self) -> bool {
        matches!(self, FileState::Renamed | FileState::Copied)
    }
}

/// Represents a file status entry from git status
///
/// Index and worktree states are kept separately so a file that is staged
/// and then modified again keeps both signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_path: Option<String>,
    pub index: FileState,
    pub worktree: FileState,
}

/// Bucket a status entry is reported under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    Staged,
    Modified,
    Deleted,
    Untracked,
}

impl StatusEntry {
    /// The single category this entry is listed under
    ///
    /// Rules are checked in order, so an entry staged in the index and
    /// modified again in the worktree is reported as staged only. Ignored
    /// entries have no category.
    pub fn category(&self) -> Option<StatusCategory> {
        let (x, y) = (self.index.code(), self.worktree.code());
        let has = |c: char| x == c || y == c;

        if has('A') || matches!(x, 'M' | 'R' | 'C') {
            Some(StatusCategory::Staged)
        } else if has('M') || has('T') || has('U') {
            Some(StatusCategory::Modified)
        } else if has('D') {
            Some(StatusCategory::Deleted)
        } else if has('?') {
            Some(StatusCategory::Untracked)
        } else {
            None
        }
    }
}

/// Working tree status grouped for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkingTreeStatus {
    pub staged: BTreeSet<String>,
    pub modified: BTreeSet<String>,
    pub untracked: BTreeSet<String>,
    pub deleted: BTreeSet<String>,
    pub entries: Vec<StatusEntry>,
}

impl WorkingTreeStatus {
    pub fn from_entries(entries: Vec<StatusEntry>) -> Self {
        let mut status = WorkingTreeStatus::default();

        for entry in &entries {
            let bucket = match entry.category() {
                Some(StatusCategory::Staged) => &mut status.staged,
                Some(StatusCategory::Modified) => &mut status.modified,
                Some(StatusCategory::Deleted) => &mut status.deleted,
                Some(StatusCategory::Untracked) => &mut status.untracked,
                None => continue,
            };
            bucket.insert(entry.path.clone());
        }

        status.entries = entries;
        status
    }

    /// Check if the working tree has no changes in any category
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty()
            && self.modified.is_empty()
            && self.untracked.is_empty()
            && self.deleted.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_A: &str = "0123456789abcdef0123456789abcdef01234567";
    const HASH_B: &str = "fedcba9876543210fedcba9876543210fedcba98";

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    fn status_of(output: &str) -> WorkingTreeStatus {
        WorkingTreeStatus::from_entries(parse_status_porcelain(output).unwrap())
    }

    #[test]
    fn test_parse_branch_current() {
        let output = "* main\n  feature-x";
        let branches = parse_branch_list(output).unwrap();

        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].name, "main");
        assert!(branches[0].is_current);
        assert_eq!(branches[0].kind, BranchKind::Local);
        assert_eq!(branches[1].name, "feature-x");
        assert!(!branches[1].is_current);
    }

    #[test]
    fn test_parse_branch_strips_remote_prefix() {
        let output = "* main\n  remotes/origin/HEAD -> origin/main\n  remotes/origin/main\n  remotes/upstream/release/v2\n";
        let branches = parse_branch_list(output).unwrap();

        assert_eq!(branches.len(), 3);
        assert_eq!(branches[1].name, "main");
        assert_eq!(branches[1].kind, BranchKind::Remote);
        assert_eq!(branches[1].remote.as_deref(), Some("origin"));
        assert_eq!(branches[2].name, "release/v2");
        assert_eq!(branches[2].remote.as_deref(), Some("upstream"));
        assert!(branches.iter().all(|b| !b.name.contains("remotes/")));
        assert_eq!(branches.iter().filter(|b| b.is_current).count(), 1);
    }

    #[test]
    fn test_parse_branch_detached() {
        let output = "* (HEAD detached at 1a2b3c4)\n  main\n";
        let branches = parse_branch_list(output).unwrap();

        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].name, "HEAD detached at 1a2b3c4");
        assert_eq!(branches[0].kind, BranchKind::Detached);
        assert!(branches[0].is_current);
        assert!(!branches[1].is_current);
    }

    #[test]
    fn test_parse_branch_parenthesized_names_are_local() {
        let output = "  (wip)\n* (release)\n  main\n";
        let branches = parse_branch_list(output).unwrap();

        assert_eq!(branches[0].name, "(wip)");
        assert_eq!(branches[0].kind, BranchKind::Local);
        assert!(!branches[0].is_current);
        assert_eq!(branches[1].name, "(release)");
        assert_eq!(branches[1].kind, BranchKind::Local);
        assert!(branches[1].is_current);
    }

    #[test]
    fn test_parse_branch_rebase_and_detached_from_markers() {
        for marker in [
            "HEAD detached from 1a2b3c4",
            "no branch",
            "no branch, rebasing main",
            "no branch, bisect started on main",
        ] {
            let branches = parse_branch_list(&format!("* ({})\n  main\n", marker)).unwrap();
            assert_eq!(branches[0].kind, BranchKind::Detached, "{}", marker);
            assert_eq!(branches[0].name, marker);
        }
    }

    #[test]
    fn test_parse_branch_other_worktree_marker() {
        let output = "* main\n+ feature-x\n";
        let branches = parse_branch_list(output).unwrap();

        assert_eq!(branches[1].name, "feature-x");
        assert!(!branches[1].is_current);
    }

    #[test]
    fn test_parse_branch_skips_blank_lines() {
        let branches = parse_branch_list("\n  \n* main\n\n").unwrap();
        assert_eq!(branches.len(), 1);
    }

    #[test]
    fn test_parse_log() {
        let output = format!(
            "{HASH_A}\0Ada Lovelace\0ada@example.com\02024-05-01T10:00:00+02:00\0Initial commit\n\
             {HASH_B}\0Bob\0bob@example.com\02024-04-30T09:00:00+00:00\0Add README"
        );
        let commits = parse_log(&output).unwrap();

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].full_hash, HASH_A);
        assert_eq!(commits[0].short_hash, "01234567");
        assert_eq!(commits[0].author, "Ada Lovelace <ada@example.com>");
        assert_eq!(commits[0].date, "2024-05-01T10:00:00+02:00");
        assert_eq!(commits[0].message, "Initial commit");
        assert_eq!(commits[1].short_hash, "fedcba98");
        assert_eq!(commits[1].message, "Add README");
    }

    #[test]
    fn test_parse_log_message_with_separators() {
        let output = format!("{HASH_A}\0A\0a@x\02024-01-01T00:00:00Z\0fix: a | b\0c");
        let commits = parse_log(&output).unwrap();

        assert_eq!(commits[0].message, "fix: a | b\0c");
    }

    #[test]
    fn test_parse_log_empty_message() {
        let output = format!("{HASH_A}\0A\0a@x\02024-01-01T00:00:00Z\0");
        let commits = parse_log(&output).unwrap();

        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].message, "");
    }

    #[test]
    fn test_parse_log_truncated_record() {
        let output = format!("{HASH_A}\0A\0a@x");
        assert!(matches!(parse_log(&output), Err(GitError::ParseError(_))));
        assert!(matches!(
            parse_log("not-a-hash\0A\0a@x\0d\0m"),
            Err(GitError::ParseError(_))
        ));
    }

    #[test]
    fn test_short_hash_is_prefix_of_full_hash() {
        for hash in [HASH_A, HASH_B, "abc"] {
            let commit = Commit::new(hash, "n", "e", "d", "m");
            assert!(commit.full_hash.starts_with(&commit.short_hash));
            assert_eq!(commit.short_hash.len(), hash.len().min(SHORT_HASH_LEN));
        }
    }

    #[test]
    fn test_status_scenarios() {
        let status = status_of(" M foo.txt\0A  bar.txt\0?? baz.txt\0");

        assert!(status.modified.contains("foo.txt"));
        assert!(status.staged.contains("bar.txt"));
        assert!(status.untracked.contains("baz.txt"));
        assert!(status.deleted.is_empty());
        assert!(!status.is_clean());
    }

    #[test]
    fn test_status_single_record_without_terminator() {
        let status = status_of(" M foo.txt");
        assert_eq!(status.modified.len(), 1);
    }

    #[test]
    fn test_status_staged_and_modified_keeps_both_states() {
        let entries = parse_status_porcelain("MM src/lib.rs\0").unwrap();

        assert_eq!(entries[0].index, FileState::Modified);
        assert_eq!(entries[0].worktree, FileState::Modified);

        // The grouped view lists it only once, as staged
        let status = WorkingTreeStatus::from_entries(entries);
        assert!(status.staged.contains("src/lib.rs"));
        assert!(status.modified.is_empty());
    }

    #[test]
    fn test_status_deleted() {
        let status = status_of(" D gone.txt\0D  removed.txt\0");
        assert_eq!(status.deleted.len(), 2);
    }

    #[test]
    fn test_status_rename_consumes_original_path() {
        let entries = parse_status_porcelain("R  new name.txt\0old name.txt\0 M other.rs\0").unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "new name.txt");
        assert_eq!(entries[0].original_path.as_deref(), Some("old name.txt"));
        assert_eq!(entries[0].category(), Some(StatusCategory::Staged));
        assert_eq!(entries[1].path, "other.rs");
    }

    #[test]
    fn test_status_rename_missing_original_path() {
        assert!(matches!(
            parse_status_porcelain("R  new.txt\0"),
            Err(GitError::ParseError(_))
        ));
    }

    #[test]
    fn test_status_path_with_spaces_is_verbatim() {
        let status = status_of("?? dir/my file -> x.txt\0");
        assert!(status.untracked.contains("dir/my file -> x.txt"));
    }

    #[test]
    fn test_status_each_path_in_one_category() {
        let output = " M a\0M  b\0MM c\0A  d\0AM e\0 D f\0D  g\0?? h\0UU i\0 T j\0";
        let status = status_of(output);

        let total = status.staged.len()
            + status.modified.len()
            + status.untracked.len()
            + status.deleted.len();
        assert_eq!(total, 10);
        assert_eq!(status.staged, set(&["b", "c", "d", "e"]));
        assert_eq!(status.modified, set(&["a", "i", "j"]));
        assert_eq!(status.deleted, set(&["f", "g"]));
        assert_eq!(status.untracked, set(&["h"]));
    }

    #[test]
    fn test_status_ignored_has_no_category() {
        let status = status_of("!! target/\0");
        assert_eq!(status.entries.len(), 1);
        assert!(status.is_clean());
    }

    #[test]
    fn test_status_malformed() {
        assert!(parse_status_porcelain("M\0").is_err());
        assert!(parse_status_porcelain("XY path\0").is_err());
    }

    #[test]
    fn test_entry_states_round_trip_codes() {
        let entries = parse_status_porcelain("AM x\0").unwrap();
        assert_eq!(entries[0].index.code(), 'A');
        assert_eq!(entries[0].worktree.code(), 'M');
        assert_eq!(FileState::from_code('A').unwrap(), entries[0].index);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_status_porcelain("").unwrap().len(), 0);
        assert_eq!(parse_log("").unwrap().len(), 0);
        assert_eq!(parse_branch_list("").unwrap().len(), 0);

        let status = status_of("");
        assert!(status.is_clean());
        assert!(status.staged.is_empty() && status.entries.is_empty());
    }
}
