//! End-to-end negotiation against a local stand-in for a WebDriver remote end.

use std::error::Error as _;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use http_transport::{connect, HttpTransport};
use serde_json::{json, Value};
use session::{Capabilities, SessionError};

// ---------------------------------------------------------------------------
// Fake remote end
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    content_type: Option<String>,
    body: Bytes,
}

#[derive(Clone)]
struct Driver {
    status: StatusCode,
    reply: &'static str,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl Driver {
    fn replying(reply: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            reply,
            delay: None,
            requests: Arc::default(),
        }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Serves on an ephemeral port and returns the base address (`/wd/hub`).
    async fn spawn(self) -> String {
        let app = Router::new().fallback(record).with_state(self);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/wd/hub")
    }
}

async fn record(
    State(driver): State<Driver>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    driver.requests.lock().unwrap().push(Recorded {
        method,
        path: uri.path().to_owned(),
        content_type: headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        body,
    });
    if let Some(delay) = driver.delay {
        tokio::time::sleep(delay).await;
    }
    (driver.status, driver.reply)
}

// ---------------------------------------------------------------------------
// Successful negotiation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sends_envelope_and_resolves_flat_identifier() {
    let driver = Driver::replying(r#"{"sessionId": "abc123", "status": 0}"#);
    let base = driver.clone().spawn().await;
    let caps = json!({"browserName": "chrome", "goog:chromeOptions": {"args": ["--headless"]}});

    let (session, has_status) = connect(&base, Some(&caps), None).await.unwrap();

    assert!(has_status);
    assert_eq!(session.id().as_str(), "abc123");
    assert_eq!(session.url().as_str(), format!("{base}/session/abc123"));

    let requests = driver.requests();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.method, Method::POST);
    assert_eq!(req.path, "/wd/hub/session");
    assert_eq!(req.content_type.as_deref(), Some("application/json"));
    let sent: Value = serde_json::from_slice(&req.body).unwrap();
    assert_eq!(sent, json!({ "desiredCapabilities": caps }));
}

#[tokio::test]
async fn resolves_nested_identifier() {
    let driver = Driver::replying(
        r#"{"value": {"sessionId": "gecko-7", "capabilities": {"browserName": "firefox"}}}"#,
    );
    let base = driver.clone().spawn().await;

    let (session, has_status) = connect::<Capabilities>(&base, None, None).await.unwrap();

    assert!(!has_status);
    assert_eq!(session.id().as_str(), "gecko-7");

    let sent: Value = serde_json::from_slice(&driver.requests()[0].body).unwrap();
    assert_eq!(sent, json!({"desiredCapabilities": {}}));
}

#[tokio::test]
async fn trailing_slash_on_address_is_normalised() {
    let driver = Driver::replying(r#"{"SessionID": "s1"}"#);
    let base = driver.clone().spawn().await;

    let (session, _) = connect::<Capabilities>(&format!("{base}/"), None, None)
        .await
        .unwrap();

    assert_eq!(driver.requests()[0].path, "/wd/hub/session");
    assert_eq!(session.url().as_str(), format!("{base}/session/s1"));
    assert_eq!(session.endpoint("url"), format!("{base}/session/s1/url"));
}

#[tokio::test]
async fn shared_default_client_builds_without_panicking() {
    let driver = Driver::replying(r#"{"sessionId": "shared"}"#);
    let base = driver.spawn().await;

    let first = HttpTransport::shared().unwrap();
    let second = HttpTransport::shared().unwrap();

    let (opened, _) = session::connect_with::<Capabilities, _>(&base, None, first)
        .await
        .unwrap();
    assert_eq!(opened.id().as_str(), "shared");

    let (again, _) = session::connect_with::<Capabilities, _>(&base, None, second)
        .await
        .unwrap();
    assert_eq!(again.id().as_str(), "shared");
}

#[tokio::test]
async fn caller_supplied_client_is_kept_on_the_handle() {
    let driver = Driver::replying(r#"{"sessionId": "own"}"#);
    let base = driver.spawn().await;
    let client = reqwest::Client::builder()
        .user_agent("session-tests")
        .build()
        .unwrap();

    let (session, _) = connect::<Capabilities>(&base, None, Some(client))
        .await
        .unwrap();

    // The handle's transport can carry the session's later commands.
    let follow_up = session
        .transport()
        .client()
        .get(session.endpoint("url"))
        .send()
        .await
        .unwrap();
    assert_eq!(follow_up.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rejected_negotiation_reports_missing_identifier() {
    let driver = Driver {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        ..Driver::replying(
            r#"{"value": {"error": "session not created", "message": "no matching browser"}}"#,
        )
    };
    let base = driver.spawn().await;

    let err = connect::<Capabilities>(&base, None, None).await.unwrap_err();
    assert!(matches!(err, SessionError::NoSessionId), "{err:?}");
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let driver = Driver {
        status: StatusCode::BAD_GATEWAY,
        ..Driver::replying("<html>Bad Gateway</html>")
    };
    let base = driver.spawn().await;

    let err = connect::<Capabilities>(&base, None, None).await.unwrap_err();
    assert!(matches!(err, SessionError::MalformedResponse { .. }), "{err:?}");
}

#[tokio::test]
async fn unparseable_address_fails_without_network() {
    let err = connect::<Capabilities>("not a url", None, None)
        .await
        .unwrap_err();
    assert!(
        matches!(err, SessionError::RequestConstruction { source: Some(_), .. }),
        "{err:?}"
    );
}

#[tokio::test]
async fn connection_refused_is_a_transport_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = connect::<Capabilities>(&format!("http://{addr}"), None, None)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Transport { .. }), "{err:?}");
    let source = err
        .source()
        .and_then(|s| s.downcast_ref::<reqwest::Error>())
        .expect("reqwest error preserved as source");
    assert!(source.is_connect());
}

#[tokio::test]
async fn transport_timeout_is_not_retried() {
    let driver = Driver {
        delay: Some(Duration::from_secs(2)),
        ..Driver::replying(r#"{"sessionId": "late"}"#)
    };
    let base = driver.clone().spawn().await;
    let transport = HttpTransport::with_timeout(Duration::from_millis(200)).unwrap();

    let err = connect::<Capabilities>(&base, None, Some(transport.client().clone()))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Transport { .. }), "{err:?}");
    assert_eq!(driver.requests().len(), 1);
}
