//! The application-level error type and its exit-code mapping.

use broom_config::ConfigError;
use broom_github::Error as GitHubError;

/// Every way a broom run can fail, as one closed enum.
///
/// The CLI maps each variant to a process exit code, so the enum stays
/// exhaustive: adding a variant forces the mapping to be revisited at
/// compile time.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed repository reference or arguments. Exit code 2.
    #[error("{0}")]
    InvalidInput(ConfigError),

    /// Missing, invalid, or expired credentials. Exit code 3.
    #[error("{message}")]
    AuthenticationFailed {
        /// What went wrong and how to fix it.
        message: String,
        /// The underlying API error, when the token was rejected remotely.
        #[source]
        source: Option<GitHubError>,
    },

    /// The token lacks the scope or admin rights needed. Exit code 4.
    #[error(transparent)]
    InsufficientPermissions(GitHubError),

    /// The repository is absent or inaccessible. Exit code 5.
    #[error(transparent)]
    RepositoryNotFound(GitHubError),

    /// The API request quota is exhausted. Exit code 6.
    #[error(transparent)]
    RateLimited(GitHubError),

    /// Transport failure, server error, or any other API failure.
    /// Exit code 1.
    #[error(transparent)]
    Api(GitHubError),

    /// The update succeeded but a fresh read still shows the setting
    /// disabled. Never retried; a silent inconsistency must not be
    /// reported as success. Exit code 1.
    #[error(
        "setting was not applied: '{full_name}' still reports delete-on-merge disabled after the update. Retry, and check the repository's settings page if it persists"
    )]
    SettingNotApplied {
        /// The repository that failed verification.
        full_name: String,
    },
}

impl AppError {
    /// Returns the process exit code for this error.
    ///
    /// The contract with calling scripts: 0 success, 2 invalid input,
    /// 3 authentication, 4 permissions, 5 not found, 6 rate limited,
    /// 1 everything else.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInput(_) => 2,
            Self::AuthenticationFailed { .. } => 3,
            Self::InsufficientPermissions(_) => 4,
            Self::RepositoryNotFound(_) => 5,
            Self::RateLimited(_) => 6,
            Self::Api(_) | Self::SettingNotApplied { .. } => 1,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        match err {
            // A missing token is an authentication-setup failure, not a
            // malformed argument.
            ConfigError::NoToken => Self::AuthenticationFailed {
                message: err.to_string(),
                source: None,
            },
            other => Self::InvalidInput(other),
        }
    }
}

impl From<GitHubError> for AppError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::AuthenticationFailed { .. } => Self::AuthenticationFailed {
                message: err.to_string(),
                source: Some(err),
            },
            GitHubError::InsufficientPermissions { .. } => Self::InsufficientPermissions(err),
            GitHubError::RepositoryNotFound { .. } => Self::RepositoryNotFound(err),
            GitHubError::RateLimited { .. } => Self::RateLimited(err),
            other => Self::Api(other),
        }
    }
}

/// A specialized Result type for orchestration operations.
pub type Result<T> = std::result::Result<T, AppError>;
