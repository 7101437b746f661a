//! Error types for GitHub API operations.
//!
//! Every variant says what failed and, where the user can act on it, how
//! to remedy it. The retry policy lives in the client: transient failures
//! (network errors, 5xx) are retried there before one of these variants
//! surfaces; nothing here is retried by callers.

use std::time::Duration;

/// Errors that can occur during GitHub API operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The token was rejected by the API (HTTP 401).
    #[error("authentication failed: {message}. Check that the token is valid and has not expired")]
    AuthenticationFailed {
        /// The API's description of the failure.
        message: String,
    },

    /// The token lacks the scope or admin rights for the operation
    /// (HTTP 403 that is not a rate limit).
    #[error(
        "insufficient permissions: {message}. The token needs the 'repo' scope and admin access to the repository"
    )]
    InsufficientPermissions {
        /// The API's description of the failure.
        message: String,
    },

    /// The repository does not exist, or the token cannot see it
    /// (HTTP 404). The API makes these two cases indistinguishable.
    #[error(
        "repository '{full_name}' not found. It may not exist, or the token may not have access to it"
    )]
    RepositoryNotFound {
        /// The `owner/name` that was requested.
        full_name: String,
    },

    /// The request quota is exhausted (HTTP 403 with a zero-remaining
    /// rate-limit header).
    #[error("rate limit exceeded{}", format_reset_time(*.reset_after))]
    RateLimited {
        /// Time until the rate limit resets, if the API reported it.
        reset_after: Option<Duration>,
    },

    /// A transport-level failure: connection refused, DNS, timeout.
    /// Surfaced after the retry budget is exhausted.
    #[error("network failure: {message}")]
    NetworkFailure {
        /// What failed.
        message: String,
        /// The underlying transport error, if any.
        #[source]
        source: Option<reqwest::Error>,
    },

    /// GitHub kept answering 5xx through the whole retry budget.
    #[error("GitHub returned a server error (HTTP {status}): {message}. Try again later")]
    ServerError {
        /// The last 5xx status received.
        status: u16,
        /// The API's description of the failure.
        message: String,
    },

    /// A status the client has no mapping for. Never retried.
    #[error("unexpected response from GitHub (HTTP {status}): {message}")]
    UnexpectedStatus {
        /// The status received.
        status: u16,
        /// The API's description of the failure.
        message: String,
    },

    /// A 2xx response whose body did not decode as expected.
    #[error("failed to decode GitHub response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The base URL could not be parsed or joined.
    #[error("invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,
}

/// Formats the reset time for the rate limit error message.
fn format_reset_time(reset_after: Option<Duration>) -> String {
    match reset_after {
        Some(duration) => format!(", resets in {} seconds", duration.as_secs()),
        None => String::new(),
    }
}

/// A specialized Result type for GitHub API operations.
pub type Result<T> = std::result::Result<T, Error>;
