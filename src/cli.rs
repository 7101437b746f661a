//! Command-line interface definition.

use clap::Parser;

/// Enables GitHub's automatic deletion of merged branches for a repository.
#[derive(Debug, Parser)]
#[command(name = "broom", version, about)]
pub struct Cli {
    /// Repository to configure: owner/repo, or a GitHub HTTPS/SSH URL.
    pub repository: String,

    /// GitHub token. Falls back to GITHUB_TOKEN, then the gh CLI hosts file.
    #[arg(long)]
    pub token: Option<String>,

    /// Report the current state without changing anything.
    #[arg(long, conflicts_with = "dry_run")]
    pub check: bool,

    /// Show what would change without applying it.
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging on stderr.
    #[arg(short, long)]
    pub verbose: bool,
}
