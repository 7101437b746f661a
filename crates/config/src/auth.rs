//! GitHub token resolution.
//!
//! This module resolves an access token from ordered sources:
//!
//! 1. Explicit `--token` flag value
//! 2. Environment: `GITHUB_TOKEN`, then `GH_TOKEN`
//! 3. The gh CLI hosts file (`~/.config/gh/hosts.yml`), `github.com` entry
//!
//! Each source is consulted only if the previous one yielded nothing, and
//! resolution performs no network I/O. Scope validation is the API
//! client's job.
//!
//! Process-wide state (environment, filesystem) is injected through
//! [`TokenResolver::with_env`] and [`TokenResolver::with_hosts_path`] so
//! the precedence logic stays testable without touching real globals.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Environment variables consulted for a token, in priority order.
const TOKEN_ENV_VARS: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];

/// Host entry looked up in the gh hosts file.
const GITHUB_HOST: &str = "github.com";

/// Where a resolved token came from.
///
/// Carried alongside the token for diagnostics; the token value itself is
/// never logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Passed explicitly via the `--token` flag.
    Flag,
    /// Read from `GITHUB_TOKEN` or `GH_TOKEN`.
    Env,
    /// Read from the gh CLI hosts file.
    ConfigFile,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::ConfigFile => "config-file",
        };
        f.write_str(s)
    }
}

/// A resolved token plus its provenance.
///
/// The value is held as a [`SecretString`] so it cannot leak through
/// `Debug` output or logging.
#[derive(Debug, Clone)]
pub struct TokenCredential {
    value: SecretString,
    source: TokenSource,
}

impl TokenCredential {
    fn new(value: String, source: TokenSource) -> Self {
        Self {
            value: SecretString::from(value),
            source,
        }
    }

    /// Returns the secret token value.
    #[must_use]
    pub fn value(&self) -> &SecretString {
        &self.value
    }

    /// Returns where the token was found.
    #[must_use]
    pub fn source(&self) -> TokenSource {
        self.source
    }
}

/// One host entry in the gh CLI hosts file.
///
/// Only `oauth_token` matters here; everything else in the entry is
/// ignored.
#[derive(Debug, Deserialize)]
struct HostEntry {
    oauth_token: Option<String>,
}

/// Resolves a GitHub token from ordered sources.
///
/// # Examples
///
/// ```
/// use broom_config::TokenResolver;
///
/// let resolver = TokenResolver::new()
///     .with_env(|_| None)
///     .with_hosts_path(None);
///
/// let credential = resolver.resolve(Some("ghp_explicit"));
/// assert!(credential.is_ok());
/// ```
pub struct TokenResolver {
    env: Box<dyn Fn(&str) -> Option<String> + Send + Sync>,
    hosts_path: Option<PathBuf>,
}

impl TokenResolver {
    /// Creates a resolver backed by the real process environment and the
    /// default gh hosts file location (`<config dir>/gh/hosts.yml`).
    #[must_use]
    pub fn new() -> Self {
        Self {
            env: Box::new(|name| std::env::var(name).ok()),
            hosts_path: dirs::config_dir().map(|d| d.join("gh").join("hosts.yml")),
        }
    }

    /// Replaces the environment lookup, for tests.
    #[must_use]
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Replaces the gh hosts file path. `None` disables the config-file
    /// source entirely.
    #[must_use]
    pub fn with_hosts_path(mut self, path: Option<PathBuf>) -> Self {
        self.hosts_path = path;
        self
    }

    /// Resolves a token, trying each source in order.
    ///
    /// Whitespace-only values count as "nothing" and resolution moves on
    /// to the next source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoToken`] if no source yields a value, or a
    /// hosts-file error if the file exists but cannot be read or parsed.
    pub fn resolve(&self, explicit: Option<&str>) -> Result<TokenCredential> {
        // 1. Explicit flag value
        if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(TokenCredential::new(token.to_string(), TokenSource::Flag));
        }

        // 2. Environment
        for var in TOKEN_ENV_VARS {
            if let Some(token) = (self.env)(var) {
                let token = token.trim();
                if !token.is_empty() {
                    return Ok(TokenCredential::new(token.to_string(), TokenSource::Env));
                }
            }
        }

        // 3. gh CLI hosts file
        if let Some(path) = &self.hosts_path {
            if let Some(token) = read_hosts_token(path)? {
                return Ok(TokenCredential::new(token, TokenSource::ConfigFile));
            }
        }

        Err(ConfigError::NoToken)
    }
}

impl Default for TokenResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads the `github.com` oauth token from a gh hosts file.
///
/// A missing file, a missing `github.com` entry, or an entry without an
/// `oauth_token` all return `Ok(None)` so resolution can continue. A file
/// that exists but cannot be read or parsed is a hard error.
fn read_hosts_token(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadHostsFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let hosts: HashMap<String, HostEntry> =
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseHostsFile {
            path: path.to_path_buf(),
            source: e,
        })?;

    let token = hosts
        .get(GITHUB_HOST)
        .and_then(|entry| entry.oauth_token.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Ok(token)
}
