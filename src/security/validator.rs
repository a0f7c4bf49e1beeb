use std::path::{Component, Path};
use thiserror::Error;

use crate::security::{BRANCH_NAME_EXTRA_CHARS, MAX_BRANCH_NAME_LEN};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Branch name is required")]
    EmptyBranchName,

    #[error("Branch name contains disallowed character {0:?}")]
    DisallowedCharacter(char),

    #[error("Branch name is not a valid ref name: {0}")]
    InvalidRefName(String),

    #[error("Branch name is longer than {0} characters")]
    BranchNameTooLong(usize),

    #[error("File path is required")]
    EmptyPath,

    #[error("File path must be relative to the repository root: {0}")]
    AbsolutePath(String),

    #[error("File path escapes the repository: {0}")]
    PathTraversal(String),

    #[error("File path contains a NUL byte")]
    NulInPath,
}

/// Validates caller-supplied identifiers before they reach a git argument list
///
/// Arguments are never interpreted by a shell, but git itself treats a leading
/// `-` as an option and accepts ref-name syntax like `@{-1}` or `HEAD~2`, so
/// names are restricted to a conservative character set.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputValidator;

impl InputValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a branch name used for create, checkout or delete
    pub fn validate_branch_name<'a>(&self, name: &'a str) -> Result<&'a str, ValidationError> {
        let name = name.trim();

        if name.is_empty() {
            return Err(ValidationError::EmptyBranchName);
        }

        if name.chars().count() > MAX_BRANCH_NAME_LEN {
            return Err(ValidationError::BranchNameTooLong(MAX_BRANCH_NAME_LEN));
        }

        if let Some(c) = name
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && !BRANCH_NAME_EXTRA_CHARS.contains(c))
        {
            return Err(ValidationError::DisallowedCharacter(c));
        }

        self.check_ref_format(name)?;

        Ok(name)
    }

    /// Validate a repository-relative file path used to narrow a diff or log
    pub fn validate_path<'a>(&self, path: &'a str) -> Result<&'a str, ValidationError> {
        if path.is_empty() {
            return Err(ValidationError::EmptyPath);
        }

        if path.contains('\0') {
            return Err(ValidationError::NulInPath);
        }

        let as_path = Path::new(path);
        if as_path.is_absolute() || path.starts_with('/') {
            return Err(ValidationError::AbsolutePath(path.to_string()));
        }

        if as_path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(ValidationError::PathTraversal(path.to_string()));
        }

        Ok(path)
    }

    /// The subset of `git check-ref-format` rules reachable with the allowed characters
    fn check_ref_format(&self, name: &str) -> Result<(), ValidationError> {
        let reject = |reason: &str| Err(ValidationError::InvalidRefName(reason.to_string()));

        if name.starts_with('-') {
            return reject("must not start with '-'");
        }
        if name.starts_with('/') || name.ends_with('/') {
            return reject("must not start or end with '/'");
        }
        if name.ends_with('.') {
            return reject("must not end with '.'");
        }
        if name.ends_with(".lock") {
            return reject("must not end with '.lock'");
        }
        if name.contains("..") {
            return reject("must not contain '..'");
        }
        if name.contains("//") {
            return reject("must not contain '//'");
        }
        if name.split('/').any(|segment| segment.starts_with('.')) {
            return reject("path segments must not start with '.'");
        }
        if name == "HEAD" {
            return reject("'HEAD' is reserved");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_branch_names() {
        let validator = InputValidator::new();
        assert_eq!(validator.validate_branch_name("main"), Ok("main"));
        assert_eq!(validator.validate_branch_name("feature-x"), Ok("feature-x"));
        assert_eq!(
            validator.validate_branch_name("release/v1.0_rc"),
            Ok("release/v1.0_rc")
        );
    }

    #[test]
    fn test_branch_name_is_trimmed() {
        let validator = InputValidator::new();
        assert_eq!(validator.validate_branch_name("  topic \n"), Ok("topic"));
    }

    #[test]
    fn test_empty_branch_name() {
        let validator = InputValidator::new();
        assert_eq!(
            validator.validate_branch_name(""),
            Err(ValidationError::EmptyBranchName)
        );
        assert_eq!(
            validator.validate_branch_name("   "),
            Err(ValidationError::EmptyBranchName)
        );
    }

    #[test]
    fn test_shell_metacharacters_rejected() {
        let validator = InputValidator::new();
        for name in ["a;rm -rf /", "$(whoami)", "`id`", "a|b", "a b", "x&&y"] {
            assert!(
                matches!(
                    validator.validate_branch_name(name),
                    Err(ValidationError::DisallowedCharacter(_))
                ),
                "expected {name:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_option_injection_rejected() {
        let validator = InputValidator::new();
        assert!(matches!(
            validator.validate_branch_name("--force"),
            Err(ValidationError::InvalidRefName(_))
        ));
        assert!(matches!(
            validator.validate_branch_name("-D"),
            Err(ValidationError::InvalidRefName(_))
        ));
    }

    #[test]
    fn test_ref_syntax_rejected() {
        let validator = InputValidator::new();
        assert!(validator.validate_branch_name("@{-1}").is_err());
        assert!(validator.validate_branch_name("HEAD~2").is_err());
        assert!(validator.validate_branch_name("a..b").is_err());
        assert!(validator.validate_branch_name("topic.lock").is_err());
        assert!(validator.validate_branch_name("feature/").is_err());
        assert!(validator.validate_branch_name("a//b").is_err());
        assert!(validator.validate_branch_name(".hidden").is_err());
        assert!(validator.validate_branch_name("HEAD").is_err());
    }

    #[test]
    fn test_branch_name_too_long() {
        let validator = InputValidator::new();
        let name = "a".repeat(MAX_BRANCH_NAME_LEN + 1);
        assert_eq!(
            validator.validate_branch_name(&name),
            Err(ValidationError::BranchNameTooLong(MAX_BRANCH_NAME_LEN))
        );
    }

    #[test]
    fn test_valid_paths() {
        let validator = InputValidator::new();
        assert_eq!(validator.validate_path("README.md"), Ok("README.md"));
        assert_eq!(validator.validate_path("src/my file.rs"), Ok("src/my file.rs"));
        assert_eq!(validator.validate_path("-weird"), Ok("-weird"));
    }

    #[test]
    fn test_invalid_paths() {
        let validator = InputValidator::new();
        assert_eq!(validator.validate_path(""), Err(ValidationError::EmptyPath));
        assert!(matches!(
            validator.validate_path("/etc/passwd"),
            Err(ValidationError::AbsolutePath(_))
        ));
        assert!(matches!(
            validator.validate_path("../outside.txt"),
            Err(ValidationError::PathTraversal(_))
        ));
        assert!(matches!(
            validator.validate_path("src/../../x"),
            Err(ValidationError::PathTraversal(_))
        ));
        assert_eq!(
            validator.validate_path("a\0b"),
            Err(ValidationError::NulInPath)
        );
    }
}
