//! broom - enables GitHub's automatic deletion of merged branches.
//!
//! This is the thin CLI layer: flag parsing, logging setup, signal
//! handling, output rendering, and exit-code selection. All decisions
//! live in the `broom-core` orchestrator.

mod cli;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use broom_config::{RepoRef, TokenResolver};
use broom_core::{AppError, ConfigOutcome, Mode, Orchestrator};
use broom_github::GitHubClient;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Ctrl-C trips the token, which aborts in-flight requests and any
    // pending backoff sleep.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            signal_cancel.cancel();
        }
    });

    match run(&cli, &cancel).await {
        Ok(outcome) => {
            render(&cli, &outcome);
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.exit_code());
        }
    }
}

/// Parses the reference, resolves and validates the token, and drives the
/// orchestrator.
async fn run(cli: &Cli, cancel: &CancellationToken) -> Result<ConfigOutcome, AppError> {
    let repo = RepoRef::parse(&cli.repository)?;
    let credential = TokenResolver::new().resolve(cli.token.as_deref())?;
    debug!(source = %credential.source(), "resolved token");

    let client = GitHubClient::new(credential.value().clone())?;
    let identity = client.validate_token(cancel).await?;
    debug!(login = %identity.login, "token validated");

    // Classic tokens report scopes; fine-grained ones report none, so an
    // empty set is not a failure.
    if !identity.scopes.is_empty() && !identity.scopes.contains("repo") {
        warn!(
            scopes = %identity.scopes,
            "token does not list the 'repo' scope; the update may be rejected"
        );
    }

    let orchestrator = Orchestrator::new(client);
    if cli.check {
        orchestrator.check_status(&repo, cancel).await
    } else {
        let mode = if cli.dry_run { Mode::DryRun } else { Mode::Apply };
        orchestrator.configure(&repo, mode, cancel).await
    }
}

/// Renders the outcome for humans. The core never formats text itself.
fn render(cli: &Cli, outcome: &ConfigOutcome) {
    if cli.check {
        let state = if outcome.now_enabled {
            "enabled"
        } else {
            "disabled"
        };
        println!(
            "{}: delete-on-merge is {state} (default branch: {})",
            outcome.full_name, outcome.default_branch
        );
    } else if outcome.already_enabled {
        println!(
            "{}: delete-on-merge already enabled, nothing to do",
            outcome.full_name
        );
    } else if outcome.now_enabled {
        println!(
            "{}: delete-on-merge enabled. Branches merged into '{}' will now be deleted automatically",
            outcome.full_name, outcome.default_branch
        );
    } else {
        println!(
            "{}: would enable delete-on-merge (dry run, nothing changed)",
            outcome.full_name
        );
    }
}

/// Installs the stderr subscriber. `--verbose` raises the default level
/// to debug for the broom crates; `RUST_LOG` still wins when set.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "warn,broom=debug,broom_config=debug,broom_core=debug,broom_github=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}
