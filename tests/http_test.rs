//! HTTP client and queue tests against a local mock server.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fetchq::{
    Config, FaultKind, FetchQueue, HttpClient, HttpFault, Locale, cancel_after, cancel_pair,
};

fn config(retry_bound: u32) -> Config {
    Config {
        retry_bound,
        ..Config::default()
    }
}

#[tokio::test]
async fn get_json_decodes_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fact"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"fact": "cats sleep"})))
        .expect(1)
        .mount(&server)
        .await;

    let http = HttpClient::new(&Config::default()).unwrap();
    let payload = http
        .get_json(&format!("{}/fact", server.uri()), None)
        .await
        .unwrap();

    assert_eq!(payload, json!({"fact": "cats sleep"}));
}

#[tokio::test]
async fn error_status_becomes_remote_fault() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let http = HttpClient::new(&Config::default()).unwrap();
    let fault = http.get_json(&server.uri(), None).await.unwrap_err();

    assert_eq!(fault.status, Some(404));
    assert!(!fault.cancelled);
}

#[tokio::test]
async fn refused_connection_is_transport_no_response() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let queue = FetchQueue::new(&config(2));
    let http = HttpClient::new(&Config::default()).unwrap();
    let fault = queue
        .enqueue(http.factory(format!("http://{addr}/"), None))
        .unwrap()
        .await
        .unwrap_err();

    assert_eq!(fault.kind, FaultKind::TransportNoResponse);
    assert!(!fault.detail.is_empty());
}

#[tokio::test]
async fn non_json_body_is_unclassified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .expect(2)
        .mount(&server)
        .await;

    let queue = FetchQueue::new(&config(2));
    let http = HttpClient::new(&Config::default()).unwrap();
    let fault = queue
        .enqueue(http.factory(server.uri(), None))
        .unwrap()
        .await
        .unwrap_err();

    assert_eq!(fault.kind, FaultKind::Unclassified);
    assert_eq!(
        fault.summary,
        "An unexpected error occurred, please contact support"
    );
}

#[tokio::test]
async fn server_errors_are_retried_with_fresh_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let queue = FetchQueue::new(&config(5));
    let http = HttpClient::new(&Config::default()).unwrap();
    let payload = queue
        .enqueue(http.factory(format!("{}/flaky", server.uri()), None))
        .unwrap()
        .await
        .unwrap();

    assert_eq!(payload, json!({"ok": true}));
}

#[tokio::test]
async fn persistent_server_error_is_abandoned_at_retry_bound() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let queue = FetchQueue::new(&config(3));
    let http = HttpClient::new(&Config::default()).unwrap();
    let fault = queue
        .enqueue(http.factory(server.uri(), None))
        .unwrap()
        .await
        .unwrap_err();

    assert_eq!(fault.kind, FaultKind::RemoteError(503));
    assert!(fault.detail.contains("503"));
}

#[tokio::test]
async fn cancel_after_aborts_slow_request_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(1)))
        .mount(&server)
        .await;

    let queue = FetchQueue::new(&config(5));
    let mut events = queue.subscribe();
    let http = HttpClient::new(&Config::default()).unwrap();

    let slow = queue
        .enqueue(http.factory(
            format!("{}/slow", server.uri()),
            Some(cancel_after(Duration::from_millis(100))),
        ))
        .unwrap();
    let fast = queue
        .enqueue(http.factory(format!("{}/fast", server.uri()), None))
        .unwrap();

    let fault = slow.await.unwrap_err();
    assert_eq!(fault.kind, FaultKind::Cancelled);
    assert_eq!(fast.await.unwrap(), json!(1));

    queue.close().await.unwrap();
    let mut started = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event.kind, fetchq::event::EventKind::Started { .. }) {
            started += 1;
        }
    }
    assert_eq!(started, 2);
}

#[tokio::test]
async fn already_cancelled_signal_skips_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(1)))
        .expect(0)
        .mount(&server)
        .await;

    let (handle, signal) = cancel_pair();
    handle.cancel();

    let http = HttpClient::new(&Config::default()).unwrap();
    let fault: HttpFault = http.get_json(&server.uri(), Some(signal)).await.unwrap_err();
    assert!(fault.cancelled);
}

#[tokio::test]
async fn request_timeout_is_transport_no_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = Config {
        retry_bound: 1,
        request_timeout: Some(Duration::from_millis(100)),
        locale: Locale::Es,
        ..Config::default()
    };
    let queue = FetchQueue::new(&config);
    let http = HttpClient::new(&config).unwrap();
    let fault = queue
        .enqueue(http.factory(server.uri(), None))
        .unwrap()
        .await
        .unwrap_err();

    assert_eq!(fault.kind, FaultKind::TransportNoResponse);
    assert_eq!(fault.title, "Oops, algo ha pasado");
}

#[tokio::test]
async fn auth_token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"authed": true})))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config {
        auth_token: Some(SecretString::from("sk-test".to_string())),
        ..Config::default()
    };
    let http = HttpClient::new(&config).unwrap();
    let payload = http.get_json(&server.uri(), None).await.unwrap();

    assert_eq!(payload, json!({"authed": true}));
}
