//! Wire and domain types for the GitHub API surface broom uses.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A point-in-time view of a repository's settings.
///
/// Snapshots are fetched fresh on every read and never cached: the
/// orchestrator's "already enabled" decision depends on the value being
/// current, and verification after a write relies on a second independent
/// read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySnapshot {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// The repository's default branch.
    pub default_branch: String,
    /// Whether head branches are deleted automatically after merge.
    pub delete_on_merge: bool,
}

impl RepositorySnapshot {
    /// Returns the full repository name in `"owner/name"` format.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// The settings change sent on update. Write-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettingsPatch {
    /// Target value for the delete-on-merge setting.
    pub delete_branch_on_merge: bool,
}

/// The scopes granted to a token, read from the `x-oauth-scopes` header.
///
/// Fine-grained tokens do not report scopes through this header, so an
/// empty set means "unknown" rather than "no access".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenScopes(BTreeSet<String>);

impl TokenScopes {
    /// Parses the comma-separated `x-oauth-scopes` header value.
    #[must_use]
    pub fn from_header(value: &str) -> Self {
        Self(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Returns whether the given scope was granted.
    #[must_use]
    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    /// Returns whether no scopes were reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TokenScopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for scope in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            f.write_str(scope)?;
            first = false;
        }
        Ok(())
    }
}

/// The result of validating a token against the identity endpoint.
#[derive(Debug, Clone)]
pub struct TokenIdentity {
    /// The login of the user the token belongs to.
    pub login: String,
    /// The scopes granted to the token.
    pub scopes: TokenScopes,
}

/// Repository payload as returned by `GET /repos/{owner}/{repo}`.
///
/// Only the fields broom reads. `delete_branch_on_merge` is omitted by the
/// API when the token lacks push access; it is read as `false` and the
/// real permission problem surfaces on the subsequent write.
#[derive(Debug, Deserialize)]
pub(crate) struct RepositoryPayload {
    name: String,
    owner: OwnerPayload,
    default_branch: Option<String>,
    delete_branch_on_merge: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwnerPayload {
    login: String,
}

impl RepositoryPayload {
    pub(crate) fn into_snapshot(self) -> RepositorySnapshot {
        RepositorySnapshot {
            owner: self.owner.login,
            name: self.name,
            default_branch: self.default_branch.unwrap_or_else(|| "main".to_string()),
            delete_on_merge: self.delete_branch_on_merge.unwrap_or(false),
        }
    }
}
