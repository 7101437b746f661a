//! GitHub API client implementation.
//!
//! This module provides the [`GitHubClient`] struct for the three API
//! operations broom needs (validate token, fetch repository, update
//! repository), and the [`RepositoryApi`] trait the orchestrator consumes
//! so it can be tested against a double.
//!
//! # Retry policy
//!
//! Transport errors and HTTP 5xx are retried up to 3 total attempts with
//! exponential backoff. A 403 whose `x-ratelimit-remaining` header is zero
//! is a rate limit, not a permission failure: if the reset fits inside the
//! call's remaining time budget the client waits once and retries,
//! otherwise it fails fast with [`Error::RateLimited`]. No other 4xx is
//! ever retried. Every call is bounded by an overall timeout (30s by
//! default) and by the caller's [`CancellationToken`], which also aborts
//! pending backoff sleeps.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

use broom_config::RepoRef;

use crate::error::{Error, Result};
use crate::models::{RepositoryPayload, RepositorySnapshot, SettingsPatch, TokenIdentity, TokenScopes};

/// Production API endpoint.
const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Overall budget for a single logical call, retries included.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Base delay for exponential backoff between retry attempts.
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Total attempts for transient failures (first try included).
const MAX_ATTEMPTS: u32 = 3;

/// GitHub REST media type.
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Pinned REST API version.
const API_VERSION: &str = "2022-11-28";

/// Margin added when sleeping until a rate-limit reset, since the reset
/// header has whole-second resolution.
const RESET_MARGIN: Duration = Duration::from_secs(1);

/// The API operations the orchestrator depends on.
///
/// [`GitHubClient`] is the production implementation; tests substitute a
/// scripted double to drive the state machine without a network.
#[async_trait::async_trait]
pub trait RepositoryApi: Send + Sync {
    /// Validates the token against the identity endpoint and returns the
    /// authenticated login plus granted scopes.
    async fn validate_token(&self, cancel: &CancellationToken) -> Result<TokenIdentity>;

    /// Fetches a fresh snapshot of the repository's settings.
    async fn get_repository(
        &self,
        repo: &RepoRef,
        cancel: &CancellationToken,
    ) -> Result<RepositorySnapshot>;

    /// Applies a settings patch to the repository.
    async fn update_repository(
        &self,
        repo: &RepoRef,
        patch: &SettingsPatch,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// Authenticated GitHub API client.
///
/// Tokens are stored as [`SecretString`] to keep them out of `Debug`
/// output and logs.
///
/// # Examples
///
/// ```no_run
/// use broom_github::GitHubClient;
/// use secrecy::SecretString;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> broom_github::Result<()> {
/// let token = SecretString::from("ghp_your_token".to_string());
/// let client = GitHubClient::new(token)?;
///
/// let identity = client.validate_token(&CancellationToken::new()).await?;
/// println!("authenticated as {}", identity.login);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: Url,
    token: SecretString,
    timeout: Duration,
    backoff_base: Duration,
}

/// A fully-read response: status, headers, and body text.
struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl ApiResponse {
    fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(Error::from)
    }

    /// Extracts the `message` field GitHub puts in error bodies, falling
    /// back to the status line when the body is not the usual shape.
    fn message(&self) -> String {
        #[derive(Deserialize)]
        struct ErrorPayload {
            message: String,
        }

        serde_json::from_str::<ErrorPayload>(&self.body)
            .map(|p| p.message)
            .unwrap_or_else(|_| {
                self.status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            })
    }

    fn into_unexpected(self) -> Error {
        Error::UnexpectedStatus {
            status: self.status.as_u16(),
            message: self.message(),
        }
    }
}

impl GitHubClient {
    /// Creates a client against the production API endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to initialize.
    pub fn new(token: SecretString) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Creates a client against a custom endpoint. Used by tests to point
    /// at a local server.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL or the HTTP
    /// client fails to initialize.
    pub fn with_base_url(token: SecretString, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("broom/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::NetworkFailure {
                message: "failed to initialize HTTP client".to_string(),
                source: Some(e),
            })?;

        Ok(Self {
            http,
            base_url,
            token,
            timeout: DEFAULT_TIMEOUT,
            backoff_base: DEFAULT_BACKOFF_BASE,
        })
    }

    /// Overrides the overall per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the backoff base delay. Tests shrink this so retry runs
    /// stay fast.
    #[must_use]
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Validates the token by calling the `/user` endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationFailed`] for a rejected token and
    /// [`Error::InsufficientPermissions`] when the API reports missing
    /// scopes.
    #[instrument(skip(self, cancel))]
    pub async fn validate_token(&self, cancel: &CancellationToken) -> Result<TokenIdentity> {
        #[derive(Deserialize)]
        struct UserPayload {
            login: String,
        }

        debug!("validating token against /user");
        let response = self.execute(Method::GET, "user", None, cancel).await?;

        match response.status {
            status if status.is_success() => {
                let scopes = response
                    .headers
                    .get("x-oauth-scopes")
                    .and_then(|v| v.to_str().ok())
                    .map(TokenScopes::from_header)
                    .unwrap_or_default();
                let user: UserPayload = response.parse()?;
                debug!(login = %user.login, scopes = %scopes, "token validated");
                Ok(TokenIdentity {
                    login: user.login,
                    scopes,
                })
            }
            StatusCode::UNAUTHORIZED => Err(Error::AuthenticationFailed {
                message: response.message(),
            }),
            StatusCode::FORBIDDEN => Err(Error::InsufficientPermissions {
                message: scope_hint(&response),
            }),
            _ => Err(response.into_unexpected()),
        }
    }

    /// Fetches the current settings snapshot for a repository.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RepositoryNotFound`] on 404. That status also
    /// covers private repositories the token cannot see; the API makes
    /// the two indistinguishable.
    #[instrument(skip(self, cancel), fields(repository = %repo))]
    pub async fn get_repository(
        &self,
        repo: &RepoRef,
        cancel: &CancellationToken,
    ) -> Result<RepositorySnapshot> {
        debug!("fetching repository");
        let path = format!("repos/{}/{}", repo.owner(), repo.name());
        let response = self.execute(Method::GET, &path, None, cancel).await?;

        match response.status {
            status if status.is_success() => {
                let payload: RepositoryPayload = response.parse()?;
                let snapshot = payload.into_snapshot();
                debug!(
                    default_branch = %snapshot.default_branch,
                    delete_on_merge = snapshot.delete_on_merge,
                    "fetched repository"
                );
                Ok(snapshot)
            }
            StatusCode::NOT_FOUND => Err(Error::RepositoryNotFound {
                full_name: repo.full_name(),
            }),
            StatusCode::UNAUTHORIZED => Err(Error::AuthenticationFailed {
                message: response.message(),
            }),
            StatusCode::FORBIDDEN => Err(Error::InsufficientPermissions {
                message: response.message(),
            }),
            _ => Err(response.into_unexpected()),
        }
    }

    /// Applies a settings patch via `PATCH /repos/{owner}/{repo}`.
    ///
    /// # Errors
    ///
    /// Same status mapping as [`get_repository`](Self::get_repository);
    /// success requires a 2xx response.
    #[instrument(skip(self, cancel, patch), fields(repository = %repo))]
    pub async fn update_repository(
        &self,
        repo: &RepoRef,
        patch: &SettingsPatch,
        cancel: &CancellationToken,
    ) -> Result<()> {
        debug!(
            delete_branch_on_merge = patch.delete_branch_on_merge,
            "updating settings"
        );
        let path = format!("repos/{}/{}", repo.owner(), repo.name());
        let body = serde_json::to_value(patch)?;
        let response = self
            .execute(Method::PATCH, &path, Some(body), cancel)
            .await?;

        match response.status {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(Error::RepositoryNotFound {
                full_name: repo.full_name(),
            }),
            StatusCode::UNAUTHORIZED => Err(Error::AuthenticationFailed {
                message: response.message(),
            }),
            StatusCode::FORBIDDEN => Err(Error::InsufficientPermissions {
                message: response.message(),
            }),
            _ => Err(response.into_unexpected()),
        }
    }

    /// Sends one logical request, applying the retry, rate-limit, timeout,
    /// and cancellation policies.
    ///
    /// Returns the response for any status the policies do not consume;
    /// mapping 4xx statuses to errors is the caller's job since their
    /// meaning depends on the endpoint.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        let url = self.base_url.join(path)?;
        let deadline = Instant::now() + self.timeout;
        let mut attempt: u32 = 1;
        let mut waited_for_reset = false;

        loop {
            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .bearer_auth(self.token.expose_secret())
                .header(reqwest::header::ACCEPT, GITHUB_MEDIA_TYPE)
                .header("X-GitHub-Api-Version", API_VERSION);
            if let Some(body) = &body {
                request = request.json(body);
            }

            let attempt_future = async {
                let response = request.send().await?;
                let status = response.status();
                let headers = response.headers().clone();
                let body = response.text().await?;
                Ok::<_, reqwest::Error>(ApiResponse {
                    status,
                    headers,
                    body,
                })
            };

            let outcome = tokio::select! {
                () = cancel.cancelled() => return Err(Error::Cancelled),
                outcome = tokio::time::timeout_at(deadline, attempt_future) => outcome,
            };

            let response = match outcome {
                Err(_elapsed) => {
                    return Err(Error::NetworkFailure {
                        message: format!(
                            "request to {url} timed out after {} seconds",
                            self.timeout.as_secs()
                        ),
                        source: None,
                    });
                }
                Ok(Err(e)) => {
                    if attempt < MAX_ATTEMPTS {
                        warn!(attempt, error = %e, "network error, retrying");
                        self.backoff(attempt, deadline, cancel).await?;
                        attempt += 1;
                        continue;
                    }
                    return Err(Error::NetworkFailure {
                        message: format!("request to {url} failed after {MAX_ATTEMPTS} attempts"),
                        source: Some(e),
                    });
                }
                Ok(Ok(response)) => response,
            };

            if response.status.is_server_error() {
                if attempt < MAX_ATTEMPTS {
                    warn!(attempt, status = %response.status, "server error, retrying");
                    self.backoff(attempt, deadline, cancel).await?;
                    attempt += 1;
                    continue;
                }
                return Err(Error::ServerError {
                    status: response.status.as_u16(),
                    message: response.message(),
                });
            }

            if response.status == StatusCode::FORBIDDEN
                && rate_limit_remaining(&response.headers) == Some(0)
            {
                let reset_after = rate_limit_reset(&response.headers);

                // One deferred retry, and only when the reset fits inside
                // the remaining time budget.
                if !waited_for_reset {
                    if let Some(wait) = reset_after {
                        let wait = wait + RESET_MARGIN;
                        if Instant::now() + wait < deadline {
                            warn!(
                                wait_secs = wait.as_secs(),
                                "rate limited, waiting for reset"
                            );
                            waited_for_reset = true;
                            cancellable_sleep(wait, cancel).await?;
                            continue;
                        }
                    }
                }
                return Err(Error::RateLimited { reset_after });
            }

            return Ok(response);
        }
    }

    /// Sleeps the exponential-backoff delay for the given attempt, unless
    /// that would overrun the overall deadline.
    async fn backoff(
        &self,
        attempt: u32,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let delay = self.backoff_base * 2u32.saturating_pow(attempt - 1);
        if Instant::now() + delay >= deadline {
            return Err(Error::NetworkFailure {
                message: format!(
                    "timed out after {} seconds while waiting to retry",
                    self.timeout.as_secs()
                ),
                source: None,
            });
        }
        cancellable_sleep(delay, cancel).await
    }
}

#[async_trait::async_trait]
impl RepositoryApi for GitHubClient {
    async fn validate_token(&self, cancel: &CancellationToken) -> Result<TokenIdentity> {
        Self::validate_token(self, cancel).await
    }

    async fn get_repository(
        &self,
        repo: &RepoRef,
        cancel: &CancellationToken,
    ) -> Result<RepositorySnapshot> {
        Self::get_repository(self, repo, cancel).await
    }

    async fn update_repository(
        &self,
        repo: &RepoRef,
        patch: &SettingsPatch,
        cancel: &CancellationToken,
    ) -> Result<()> {
        Self::update_repository(self, repo, patch, cancel).await
    }
}

/// Sleeps for `delay`, aborting immediately if the token fires.
async fn cancellable_sleep(delay: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        () = cancel.cancelled() => Err(Error::Cancelled),
        () = tokio::time::sleep(delay) => Ok(()),
    }
}

/// Reads a numeric header value.
fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// Remaining request quota, from `x-ratelimit-remaining`.
fn rate_limit_remaining(headers: &HeaderMap) -> Option<u64> {
    header_u64(headers, "x-ratelimit-remaining")
}

/// Time until the quota resets. `x-ratelimit-reset` is a Unix timestamp
/// in seconds.
fn rate_limit_reset(headers: &HeaderMap) -> Option<Duration> {
    let reset = header_u64(headers, "x-ratelimit-reset")?;
    let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
    Some(Duration::from_secs(reset.saturating_sub(now)))
}

/// Builds the scope-insufficient message for a 403 from the identity
/// endpoint, including the scopes the API says it would accept.
fn scope_hint(response: &ApiResponse) -> String {
    let message = response.message();
    match response
        .headers
        .get("x-accepted-oauth-scopes")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.trim().is_empty())
    {
        Some(accepted) => format!("{message} (accepted scopes: {accepted})"),
        None => message,
    }
}
