//! HTTP-level tests for the GitHub client.
//!
//! These run the real client against a scripted local server: each test
//! lists the exact responses the server should produce, and the server
//! records every request it sees so tests can assert on attempt counts
//! and request bodies.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use secrecy::SecretString;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use broom_config::RepoRef;
use broom_github::{Error, GitHubClient, SettingsPatch};

const REPO_BODY: &str = r#"{
    "name": "hello-world",
    "owner": { "login": "octocat" },
    "default_branch": "main",
    "delete_branch_on_merge": false
}"#;

/// Formats a complete HTTP/1.1 response with the given extra headers.
fn response(status: u16, reason: &str, extra_headers: &[(&str, &str)], body: &str) -> String {
    let mut out = format!("HTTP/1.1 {status} {reason}\r\n");
    for (name, value) in extra_headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str(&format!(
        "content-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    ));
    out
}

fn ok(body: &str) -> String {
    response(200, "OK", &[], body)
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Reads one full request (headers plus content-length body).
async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find_subslice(&buf, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_string();
            let content_length = head
                .lines()
                .find_map(|line| {
                    line.to_ascii_lowercase()
                        .strip_prefix("content-length:")
                        .map(|v| v.trim().parse::<usize>().unwrap())
                })
                .unwrap_or(0);
            if buf.len() - (end + 4) >= content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Starts a server that serves the scripted responses in order, one
/// connection each, recording every request. Returns the base URL and
/// the request log.
async fn scripted_server(responses: Vec<String>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let log = Arc::new(Mutex::new(Vec::new()));

    let requests = Arc::clone(&log);
    tokio::spawn(async move {
        for scripted in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            requests.lock().unwrap().push(request);
            stream.write_all(scripted.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
        }
    });

    (base_url, log)
}

fn client(base_url: &str) -> GitHubClient {
    GitHubClient::with_base_url(SecretString::from("ghp_test".to_string()), base_url)
        .unwrap()
        .with_backoff_base(Duration::from_millis(10))
        .with_timeout(Duration::from_secs(10))
}

fn repo() -> RepoRef {
    RepoRef::parse("octocat/hello-world").unwrap()
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

#[tokio::test]
async fn get_repository_parses_snapshot() {
    let (base_url, log) = scripted_server(vec![ok(REPO_BODY)]).await;
    let client = client(&base_url);

    let snapshot = client
        .get_repository(&repo(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(snapshot.full_name(), "octocat/hello-world");
    assert_eq!(snapshot.default_branch, "main");
    assert!(!snapshot.delete_on_merge);

    let requests = log.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("GET /repos/octocat/hello-world HTTP/1.1"));
    assert!(requests[0].contains("authorization: Bearer ghp_test"));
}

#[tokio::test]
async fn server_errors_retried_then_success() {
    let (base_url, log) = scripted_server(vec![
        response(500, "Internal Server Error", &[], "{}"),
        response(502, "Bad Gateway", &[], "{}"),
        ok(REPO_BODY),
    ])
    .await;
    let client = client(&base_url);

    let snapshot = client
        .get_repository(&repo(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(snapshot.full_name(), "octocat/hello-world");
    assert_eq!(log.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn server_errors_exhaust_retry_budget() {
    let (base_url, log) = scripted_server(vec![
        response(500, "Internal Server Error", &[], r#"{"message": "boom"}"#),
        response(500, "Internal Server Error", &[], r#"{"message": "boom"}"#),
        response(500, "Internal Server Error", &[], r#"{"message": "boom"}"#),
    ])
    .await;
    let client = client(&base_url);

    let err = client
        .get_repository(&repo(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ServerError { status: 500, .. }));
    assert_eq!(log.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let (base_url, log) = scripted_server(vec![response(
        401,
        "Unauthorized",
        &[],
        r#"{"message": "Bad credentials"}"#,
    )])
    .await;
    let client = client(&base_url);

    let err = client
        .get_repository(&repo(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AuthenticationFailed { .. }));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn not_found_maps_to_repository_not_found() {
    let (base_url, _log) = scripted_server(vec![response(
        404,
        "Not Found",
        &[],
        r#"{"message": "Not Found"}"#,
    )])
    .await;
    let client = client(&base_url);

    let err = client
        .get_repository(&repo(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::RepositoryNotFound { full_name } => {
            assert_eq!(full_name, "octocat/hello-world");
        }
        other => panic!("expected RepositoryNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn permission_403_maps_to_insufficient_permissions() {
    let (base_url, log) = scripted_server(vec![response(
        403,
        "Forbidden",
        &[("x-ratelimit-remaining", "42")],
        r#"{"message": "Must have admin rights"}"#,
    )])
    .await;
    let client = client(&base_url);

    let err = client
        .get_repository(&repo(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InsufficientPermissions { .. }));
    assert!(err.to_string().contains("Must have admin rights"));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn rate_limit_fails_fast_when_reset_is_far_away() {
    let reset = (epoch_secs() + 3600).to_string();
    let (base_url, log) = scripted_server(vec![response(
        403,
        "Forbidden",
        &[
            ("x-ratelimit-remaining", "0"),
            ("x-ratelimit-reset", &reset),
        ],
        r#"{"message": "API rate limit exceeded"}"#,
    )])
    .await;
    let client = client(&base_url);

    let err = client
        .get_repository(&repo(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::RateLimited { reset_after } => {
            let reset_after = reset_after.expect("reset time should be carried");
            assert!(reset_after > Duration::from_secs(3500));
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
    // No generic retry loop for rate limits.
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn second_rate_limit_after_deferred_retry_is_not_waited_out() {
    let reset = epoch_secs().to_string();
    let rate_limited = || {
        response(
            403,
            "Forbidden",
            &[
                ("x-ratelimit-remaining", "0"),
                ("x-ratelimit-reset", &reset),
            ],
            r#"{"message": "API rate limit exceeded"}"#,
        )
    };
    let (base_url, log) = scripted_server(vec![rate_limited(), rate_limited()]).await;
    let client = client(&base_url);

    let err = client
        .get_repository(&repo(), &CancellationToken::new())
        .await
        .unwrap_err();

    // The reset is waited out at most once; a second zero-remaining 403
    // surfaces instead of sleeping again.
    assert!(matches!(err, Error::RateLimited { .. }));
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn rate_limit_deferred_retry_after_imminent_reset() {
    let reset = epoch_secs().to_string();
    let (base_url, log) = scripted_server(vec![
        response(
            403,
            "Forbidden",
            &[
                ("x-ratelimit-remaining", "0"),
                ("x-ratelimit-reset", &reset),
            ],
            r#"{"message": "API rate limit exceeded"}"#,
        ),
        ok(REPO_BODY),
    ])
    .await;
    let client = client(&base_url);

    let snapshot = client
        .get_repository(&repo(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(snapshot.full_name(), "octocat/hello-world");
    // Exactly one deferred retry.
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn update_repository_sends_patch_body() {
    let (base_url, log) = scripted_server(vec![ok(REPO_BODY)]).await;
    let client = client(&base_url);

    client
        .update_repository(
            &repo(),
            &SettingsPatch {
                delete_branch_on_merge: true,
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let requests = log.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("PATCH /repos/octocat/hello-world HTTP/1.1"));
    assert!(requests[0].contains(r#"{"delete_branch_on_merge":true}"#));
}

#[tokio::test]
async fn validate_token_reads_login_and_scopes() {
    let (base_url, log) = scripted_server(vec![response(
        200,
        "OK",
        &[("x-oauth-scopes", "repo, read:org")],
        r#"{"login": "octocat"}"#,
    )])
    .await;
    let client = client(&base_url);

    let identity = client
        .validate_token(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(identity.login, "octocat");
    assert!(identity.scopes.contains("repo"));
    assert!(identity.scopes.contains("read:org"));

    let requests = log.lock().unwrap();
    assert!(requests[0].starts_with("GET /user HTTP/1.1"));
}

#[tokio::test]
async fn validate_token_scope_403_names_accepted_scopes() {
    let (base_url, _log) = scripted_server(vec![response(
        403,
        "Forbidden",
        &[
            ("x-accepted-oauth-scopes", "repo"),
            ("x-ratelimit-remaining", "42"),
        ],
        r#"{"message": "Resource not accessible by integration"}"#,
    )])
    .await;
    let client = client(&base_url);

    let err = client
        .validate_token(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InsufficientPermissions { .. }));
    assert!(err.to_string().contains("accepted scopes: repo"));
}

#[tokio::test]
async fn connection_refused_surfaces_network_failure() {
    // Bind then drop so the port is free but nothing listens on it.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = client(&base_url).with_timeout(Duration::from_secs(5));

    let err = client
        .get_repository(&repo(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NetworkFailure { .. }));
}

#[tokio::test]
async fn stalled_response_times_out_as_network_failure() {
    // A server that reads the request and then never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let _request = read_request(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        drop(stream);
    });

    let client = client(&base_url).with_timeout(Duration::from_millis(500));

    let err = client
        .get_repository(&repo(), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        Error::NetworkFailure { message, .. } => {
            assert!(message.contains("timed out"), "message: {message}");
        }
        other => panic!("expected NetworkFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn cancel_during_backoff_aborts_the_sleep() {
    let (base_url, log) =
        scripted_server(vec![response(500, "Internal Server Error", &[], "{}")]).await;
    // A backoff long enough that completing the sleep would be obvious.
    let client = client(&base_url)
        .with_backoff_base(Duration::from_secs(10))
        .with_timeout(Duration::from_secs(60));

    let cancel = CancellationToken::new();
    let trip = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trip.cancel();
    });

    let started = std::time::Instant::now();
    let err = client.get_repository(&repo(), &cancel).await.unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "cancellation must abort the backoff sleep, not wait it out"
    );
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn cancelled_token_aborts_immediately() {
    let (base_url, _log) = scripted_server(vec![ok(REPO_BODY)]).await;
    let client = client(&base_url);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = client.get_repository(&repo(), &cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}
