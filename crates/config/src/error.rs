//! Error types for repository parsing and token resolution.

use std::path::PathBuf;

/// Errors that can occur while parsing a repository reference or resolving
/// a GitHub token.
///
/// The parse-failure messages are part of the CLI contract: they are shown
/// to the user verbatim, so they state the expected input format rather
/// than internal details.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The repository argument was empty after trimming.
    #[error("Repository identifier is required")]
    EmptyRepository,

    /// The repository argument was not in `owner/repo` form.
    #[error("Expected format: owner/repo")]
    RepositoryFormat,

    /// An `https://github.com/...` URL did not contain exactly an owner
    /// and a repository name.
    #[error("Invalid GitHub URL format")]
    GitHubUrlFormat,

    /// A `git@github.com:...` URL did not contain exactly an owner and a
    /// repository name.
    #[error("Invalid git URL format")]
    GitUrlFormat,

    /// An owner or repository segment contained characters outside the
    /// allowed set (alphanumeric, hyphen, underscore, dot).
    #[error("Invalid repository name characters")]
    RepositoryCharset,

    /// No token was found in any source.
    #[error("No GitHub token found. Set GITHUB_TOKEN or use --token flag")]
    NoToken,

    /// The gh CLI hosts file exists but could not be read.
    #[error("failed to read gh hosts file at {path}: {source}")]
    ReadHostsFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The gh CLI hosts file exists but is not valid YAML.
    ///
    /// Distinct from a missing file: a missing file means "no token here"
    /// and resolution continues, while a corrupt file is surfaced so the
    /// user can fix it.
    #[error("failed to parse gh hosts file at {path}: {source}")]
    ParseHostsFile {
        /// The path that could not be parsed.
        path: PathBuf,
        /// The underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },
}

/// A specialized Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
