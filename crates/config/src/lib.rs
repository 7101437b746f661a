//! Repository reference parsing and token resolution for broom.
//!
//! This crate covers the two pieces of local state broom needs before it
//! can talk to the GitHub API:
//!
//! - [`RepoRef`]: a validated `(owner, name)` pair, parsed from shorthand
//!   (`owner/repo`), HTTPS URLs, or SSH URLs.
//! - [`TokenResolver`]: token resolution with strict precedence — explicit
//!   flag, then environment, then the gh CLI hosts file.
//!
//! Both components are pure with respect to the network: no API calls are
//! made here, and process-wide state (environment, filesystem) is injected
//! so the logic is testable in isolation.
//!
//! # Token Resolution
//!
//! Tokens are resolved in the following order, each source tried only if
//! the previous one yielded nothing:
//!
//! 1. `--token` flag value
//! 2. `GITHUB_TOKEN`, then `GH_TOKEN`
//! 3. `~/.config/gh/hosts.yml` (`github.com` entry, `oauth_token` key)
//!
//! A missing hosts file is "not found" and resolution continues; a hosts
//! file that exists but cannot be parsed is a hard error.
//!
//! # Examples
//!
//! ```
//! use broom_config::{RepoRef, TokenResolver};
//!
//! let repo = RepoRef::parse("https://github.com/octocat/hello-world.git").unwrap();
//! assert_eq!(repo.full_name(), "octocat/hello-world");
//!
//! let resolver = TokenResolver::new()
//!     .with_env(|_| None)
//!     .with_hosts_path(None);
//! let credential = resolver.resolve(Some("ghp_xxx")).unwrap();
//! assert_eq!(credential.source().to_string(), "flag");
//! ```

pub mod auth;
pub mod error;
pub mod repository;

pub use auth::{TokenCredential, TokenResolver, TokenSource};
pub use error::{ConfigError, Result};
pub use repository::RepoRef;
