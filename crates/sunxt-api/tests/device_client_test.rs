#![allow(clippy::unwrap_used)]
// Integration tests for `DeviceClient` using wiremock.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sunxt_api::{DeviceClient, Error, RequestTimeouts, WriteBody};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, DeviceClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = DeviceClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

// ── Read tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_read_state() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": {
                "reported": {
                    "PV": "123",
                    "SC": 87,
                    "MD": "",
                    "SN": "XT500A0001"
                }
            }
        })))
        .mount(&server)
        .await;

    let reported = client.read_state().await.unwrap();

    assert_eq!(reported.len(), 4);
    assert_eq!(reported["PV"], json!("123"));
    assert_eq!(reported["SC"], json!(87));
}

#[tokio::test]
async fn test_read_server_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/read"))
        .respond_with(ResponseTemplate::new(500).set_body_string("busy"))
        .mount(&server)
        .await;

    match client.read_state().await {
        Err(Error::Http { status, ref body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "busy");
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_read_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/read"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let result = client.read_state().await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_read_reported_not_object() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/read"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"state": {"reported": [1, 2, 3]}})),
        )
        .mount(&server)
        .await;

    let result = client.read_state().await;
    assert!(
        matches!(result, Err(Error::MalformedState { .. })),
        "expected MalformedState error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_read_timeout() {
    let (server, client) = setup().await;
    let client = client.with_timeouts(RequestTimeouts {
        read: Duration::from_millis(100),
        ..RequestTimeouts::default()
    });

    Mock::given(method("GET"))
        .and(path("/read"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"state": {"reported": {}}}))
                .set_delay(Duration::from_millis(1_000)),
        )
        .mount(&server)
        .await;

    let result = client.read_state().await;
    match result {
        Err(ref e @ Error::Timeout { timeout_ms }) => {
            assert_eq!(timeout_ms, 100);
            assert!(e.is_connectivity());
        }
        other => panic!("expected Timeout error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused() {
    // Bind then drop a listener so the port is very likely closed.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let base_url = Url::parse(&format!("http://127.0.0.1:{port}")).unwrap();
    let client = DeviceClient::with_client(reqwest::Client::new(), base_url);

    let result = client.read_state().await;
    match result {
        Err(ref e) => assert!(e.is_connectivity(), "expected connectivity error, got: {e:?}"),
        Ok(state) => panic!("expected failure, got state: {state:?}"),
    }
}

// ── Write tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_write_state() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/write"))
        .and(body_json(json!({"state": {"GS": 2400}})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client
        .write_state(&WriteBody::single("GS", json!(2400)))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_write_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/write"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad key"))
        .mount(&server)
        .await;

    let result = client
        .write_state(&WriteBody::single("XX", json!(1)))
        .await;

    match result {
        Err(Error::Http { status, ref body }) => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad key");
        }
        other => panic!("expected Http error, got: {other:?}"),
    }
}

// ── Identity probe tests ────────────────────────────────────────────

#[tokio::test]
async fn test_probe_identity() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/read"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "state": {"reported": {"SN": "XT500A0001", "DevType": "SunEnergyXT 500"}}
        })))
        .mount(&server)
        .await;

    let identity = client.probe_identity().await.unwrap();
    assert_eq!(identity.serial, "XT500A0001");
    assert_eq!(identity.model, "SunEnergyXT 500");
}

#[tokio::test]
async fn test_probe_identity_missing_model() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/read"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"state": {"reported": {"SN": "XT500A0001"}}})),
        )
        .mount(&server)
        .await;

    let result = client.probe_identity().await;
    assert!(
        matches!(result, Err(Error::MissingModel)),
        "expected MissingModel, got: {result:?}"
    );
}
