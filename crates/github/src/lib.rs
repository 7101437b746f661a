//! GitHub API client for broom.
//!
//! This crate wraps the three GitHub REST calls broom needs — validate a
//! token, fetch a repository's settings, and patch them — behind a client
//! that owns the retry, backoff, rate-limit, timeout, and cancellation
//! policies.
//!
//! # Overview
//!
//! - [`GitHubClient`]: the authenticated client
//! - [`RepositoryApi`]: the capability trait the orchestrator consumes
//! - [`RepositorySnapshot`], [`SettingsPatch`]: read and write halves of
//!   the repository settings surface
//! - [`TokenIdentity`], [`TokenScopes`]: token validation results
//! - [`Error`]: one variant per failure kind, each mapping to a distinct
//!   remediation
//!
//! # Retry and rate limits
//!
//! Transient failures (transport errors, HTTP 5xx) are retried up to 3
//! total attempts with exponential backoff. A 403 carrying a zero
//! `x-ratelimit-remaining` header is treated as a rate limit: the client
//! waits for the reset at most once when it fits the call's 30-second
//! budget, and otherwise surfaces [`Error::RateLimited`] with the reset
//! delay. Other 4xx statuses are never retried.
//!
//! Tokens are handled via [`secrecy::SecretString`] and never logged.
//!
//! # Examples
//!
//! ```no_run
//! use broom_config::RepoRef;
//! use broom_github::GitHubClient;
//! use secrecy::SecretString;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> broom_github::Result<()> {
//! let token = SecretString::from("ghp_xxx".to_string());
//! let client = GitHubClient::new(token)?;
//! let cancel = CancellationToken::new();
//!
//! let repo = RepoRef::parse("octocat/hello-world").unwrap();
//! let snapshot = client.get_repository(&repo, &cancel).await?;
//! println!(
//!     "{}: delete-on-merge {}",
//!     snapshot.full_name(),
//!     if snapshot.delete_on_merge { "on" } else { "off" },
//! );
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;

pub use client::{GitHubClient, RepositoryApi};
pub use error::{Error, Result};
pub use models::{RepositorySnapshot, SettingsPatch, TokenIdentity, TokenScopes};
