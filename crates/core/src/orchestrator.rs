//! The decide-and-apply state machine.
//!
//! The orchestrator composes a parsed [`RepoRef`] and a [`RepositoryApi`]
//! client into the core flow: fetch the current snapshot, branch on the
//! current state and mode, optionally update and re-fetch to verify.
//!
//! The key invariant: when the fetched snapshot already shows
//! delete-on-merge enabled, no write call is ever issued, regardless of
//! mode. Dry-run mode likewise never writes.

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use broom_config::RepoRef;
use broom_github::{RepositoryApi, RepositorySnapshot, SettingsPatch};

use crate::error::{AppError, Result};

/// How [`Orchestrator::configure`] should treat a disabled setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Enable the setting and verify the write took effect.
    Apply,
    /// Report what would happen without mutating anything.
    DryRun,
}

/// The result of a check or configure run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOutcome {
    /// Whether delete-on-merge was already enabled before this run.
    pub already_enabled: bool,
    /// Whether delete-on-merge is enabled now.
    pub now_enabled: bool,
    /// The repository's default branch, for display.
    pub default_branch: String,
    /// The repository's `owner/name`.
    pub full_name: String,
}

impl ConfigOutcome {
    fn new(snapshot: &RepositorySnapshot, already_enabled: bool, now_enabled: bool) -> Self {
        Self {
            already_enabled,
            now_enabled,
            default_branch: snapshot.default_branch.clone(),
            full_name: snapshot.full_name(),
        }
    }
}

/// Drives the check / dry-run / apply / verify flow against a
/// [`RepositoryApi`] implementation.
///
/// Snapshots are fetched fresh for every decision; nothing is cached
/// between calls.
pub struct Orchestrator<C> {
    client: C,
}

impl<C: RepositoryApi> Orchestrator<C> {
    /// Creates an orchestrator over the given client.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Reports the current state of the setting without mutating anything.
    ///
    /// # Errors
    ///
    /// Any client failure during the fetch propagates unchanged.
    #[instrument(skip(self, cancel), fields(repository = %repo))]
    pub async fn check_status(
        &self,
        repo: &RepoRef,
        cancel: &CancellationToken,
    ) -> Result<ConfigOutcome> {
        debug!("fetching repository");
        let snapshot = self.client.get_repository(repo, cancel).await?;
        let enabled = snapshot.delete_on_merge;
        Ok(ConfigOutcome::new(&snapshot, enabled, enabled))
    }

    /// Enables delete-on-merge, or reports what would happen in dry-run
    /// mode.
    ///
    /// After a real update the snapshot is re-fetched, and the run fails
    /// with [`AppError::SettingNotApplied`] if the fresh read does not
    /// show the setting enabled.
    ///
    /// # Errors
    ///
    /// Client failures during fetch, update, or verification propagate
    /// unchanged; verification mismatch is fatal and never retried.
    #[instrument(skip(self, cancel), fields(repository = %repo, mode = ?mode))]
    pub async fn configure(
        &self,
        repo: &RepoRef,
        mode: Mode,
        cancel: &CancellationToken,
    ) -> Result<ConfigOutcome> {
        debug!("fetching repository");
        let snapshot = self.client.get_repository(repo, cancel).await?;

        if snapshot.delete_on_merge {
            debug!("delete-on-merge already enabled, nothing to do");
            return Ok(ConfigOutcome::new(&snapshot, true, true));
        }

        if mode == Mode::DryRun {
            debug!("dry run, would enable delete-on-merge");
            return Ok(ConfigOutcome::new(&snapshot, false, false));
        }

        debug!("updating settings");
        self.client
            .update_repository(
                repo,
                &SettingsPatch {
                    delete_branch_on_merge: true,
                },
                cancel,
            )
            .await?;

        debug!("verifying setting");
        let verified = self.client.get_repository(repo, cancel).await?;
        if !verified.delete_on_merge {
            return Err(AppError::SettingNotApplied {
                full_name: verified.full_name(),
            });
        }

        Ok(ConfigOutcome::new(&verified, false, true))
    }
}
