use crate::error::{GitError, GitResult};
use crate::git::executor::CommandRunner;

/// Minimum required git version (`git branch --show-current` appeared in 2.22)
pub const MIN_GIT_VERSION: (u32, u32) = (2, 22);

/// Represents a git version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GitVersion {
    /// Ask the git binary behind `runner` for its version
    pub async fn detect(runner: &dyn CommandRunner) -> GitResult<Self> {
        let output = runner.run(&["--version"]).await;

        if !output.success {
            return Err(GitError::GitVersionDetectionFailed(
                output
                    .error_message()
                    .unwrap_or_else(|| "git --version failed".to_string()),
            ));
        }

        Self::parse(&output.stdout)
    }

    /// Parse git version from string like "git version 2.39.2"
    ///
    /// Vendor suffixes (`2.39.2.windows.1`, `2.39.3 (Apple Git-145)`) are ignored.
    pub fn parse(version_str: &str) -> GitResult<Self> {
        let number = version_str
            .trim()
            .strip_prefix("git version ")
            .and_then(|rest| rest.split_whitespace().next())
            .ok_or_else(|| {
                GitError::ParseError(format!("Unexpected git version format: {}", version_str))
            })?;

        let mut nums = number.split('.');
        let mut component = |label: &str, required: bool| -> GitResult<u32> {
            match nums.next() {
                Some(n) => n.parse::<u32>().or_else(|_| {
                    if required {
                        Err(GitError::ParseError(format!("Invalid {} version: {}", label, n)))
                    } else {
                        Ok(0)
                    }
                }),
                None if required => Err(GitError::ParseError(format!(
                    "Invalid version number format: {}",
                    number
                ))),
                None => Ok(0),
            }
        };

        let major = component("major", true)?;
        let minor = component("minor", true)?;
        let patch = component("patch", false)?;

        Ok(GitVersion {
            major,
            minor,
            patch,
        })
    }

    /// Check if this version meets minimum requirements
    pub fn is_supported(&self) -> bool {
        (self.major, self.minor) >= MIN_GIT_VERSION
    }

    /// Detect the version and reject anything older than [`MIN_GIT_VERSION`]
    pub async fn validate(runner: &dyn CommandRunner) -> GitResult<Self> {
        let version = Self::detect(runner).await?;

        if !version.is_supported() {
            return Err(GitError::GitVersionTooOld(version.to_string()));
        }

        Ok(version)
    }
}

impl std::fmt::Display for GitVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
