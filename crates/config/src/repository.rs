//! Repository reference parsing.
//!
//! This module provides the [`RepoRef`] type, which identifies a GitHub
//! repository by owner and name. References can be parsed from three
//! dialects:
//!
//! - Shorthand: `"owner/repo"`
//! - HTTPS URL: `"https://github.com/owner/repo"` (optional `.git` suffix)
//! - SSH URL: `"git@github.com:owner/repo"` (optional `.git` suffix)
//!
//! # Examples
//!
//! ```
//! use broom_config::RepoRef;
//!
//! let a = RepoRef::parse("octocat/hello-world").unwrap();
//! let b = RepoRef::parse("https://github.com/octocat/hello-world.git").unwrap();
//! assert_eq!(a, b);
//! assert_eq!(a.full_name(), "octocat/hello-world");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, Result};

/// URL prefix for the HTTPS dialect. Any other `https://` host is not
/// special-cased and fails the shorthand rules instead.
const HTTPS_PREFIX: &str = "https://github.com/";

/// URL prefix for the SSH dialect.
const SSH_PREFIX: &str = "git@github.com:";

/// A validated reference to a GitHub repository.
///
/// Both segments are non-empty and restricted to alphanumeric characters,
/// hyphens, underscores, and dots. A `RepoRef` is immutable once parsed:
/// construction goes through [`RepoRef::parse`] and fails as a whole if any
/// part of the input is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    owner: String,
    name: String,
}

impl RepoRef {
    /// Parses a repository reference from any supported dialect.
    ///
    /// Leading and trailing whitespace is ignored, so
    /// `parse(s) == parse(s.trim())` for all inputs.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the expected format when the
    /// input is empty, has the wrong shape for its dialect, or contains
    /// characters outside the allowed set. No partial value is ever
    /// returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use broom_config::RepoRef;
    ///
    /// let repo = RepoRef::parse("rust-lang/rust").unwrap();
    /// assert_eq!(repo.owner(), "rust-lang");
    /// assert_eq!(repo.name(), "rust");
    ///
    /// assert!(RepoRef::parse("rust").is_err());
    /// assert!(RepoRef::parse("octo cat/repo").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();

        let (owner, name) = if let Some(rest) = trimmed.strip_prefix(HTTPS_PREFIX) {
            Self::split_url(rest).ok_or(ConfigError::GitHubUrlFormat)?
        } else if let Some(rest) = trimmed.strip_prefix(SSH_PREFIX) {
            Self::split_url(rest).ok_or(ConfigError::GitUrlFormat)?
        } else if trimmed.is_empty() {
            return Err(ConfigError::EmptyRepository);
        } else {
            let parts: Vec<&str> = trimmed.split('/').collect();
            match parts.as_slice() {
                [owner, name] => (*owner, *name),
                _ => return Err(ConfigError::RepositoryFormat),
            }
        };

        if !is_valid_segment(owner) || !is_valid_segment(name) {
            return Err(ConfigError::RepositoryCharset);
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Splits the remainder of a URL into owner and name.
    ///
    /// Strips an optional `.git` suffix, then requires exactly two
    /// non-empty `/`-separated segments.
    fn split_url(rest: &str) -> Option<(&str, &str)> {
        let rest = rest.strip_suffix(".git").unwrap_or(rest);
        let parts: Vec<&str> = rest.split('/').collect();
        match parts.as_slice() {
            [owner, name] if !owner.is_empty() && !name.is_empty() => Some((owner, name)),
            _ => None,
        }
    }

    /// Returns the repository owner (user or organization).
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the full repository name in `"owner/name"` format.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Checks a single owner or name segment against the allowed charset.
fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
