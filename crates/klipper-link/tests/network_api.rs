//! Network configuration API tests against a mock service built on axum.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use klipper_link::{LinkError, NetworkApi};
use klipper_proto::WifiConnectionRequest;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;

// ============================================================================
// Test Helpers - Mock Network Service
// ============================================================================

/// A request as seen by the mock service.
#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    content_type: Option<String>,
    body: Bytes,
}

impl Recorded {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("json body")
    }
}

/// How the mock answers every request.
#[derive(Debug, Clone)]
enum Reply {
    /// Complete response with a JSON content type.
    Body(StatusCode, String),
    /// Response whose body stream fails after the first chunk.
    Truncated(StatusCode),
}

/// A mock network configuration service answering every path the same way.
#[derive(Clone)]
struct MockNetworkService {
    reply: Reply,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockNetworkService {
    /// Serve on an ephemeral port and return the base URL with the mock.
    async fn start(reply: Reply) -> (String, Self) {
        let mock = Self {
            reply,
            requests: Arc::new(Mutex::new(Vec::new())),
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let base_url = format!("http://{}", listener.local_addr().expect("addr"));
        let router = Router::new().fallback(record).with_state(mock.clone());
        tokio::spawn(async move { axum::serve(listener, router).await });

        (base_url, mock)
    }

    async fn ok(body: &Value) -> (String, Self) {
        Self::start(Reply::Body(StatusCode::OK, body.to_string())).await
    }

    /// The single request received so far.
    fn only_request(&self) -> Recorded {
        let requests = self.requests.lock();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests[0].clone()
    }
}

async fn record(
    State(mock): State<MockNetworkService>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    mock.requests.lock().push(Recorded {
        method,
        path: uri.path().to_string(),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        body,
    });

    match mock.reply {
        Reply::Body(status, body) => {
            (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
        Reply::Truncated(status) => {
            let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
                Ok(Bytes::from_static(b"{\"detail\":")),
                Err(std::io::Error::other("connection reset")),
            ];
            (status, Body::from_stream(futures::stream::iter(chunks))).into_response()
        }
    }
}

fn network(ssid: &str, signal: i32) -> Value {
    json!({
        "ssid": ssid,
        "signal_strength": signal,
        "security": "WPA2",
        "frequency": 2437.0,
        "is_hidden": false
    })
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_get_network_status() {
    let body = json!({
        "adapter": {"device": "wlan0", "type": "wifi", "state": "connected", "connection": "workshop"},
        "ip": {"ipv4": "192.168.1.20", "ipv6": "fe80::1", "mac": "b8:27:eb:00:00:01"},
        "signal_info": {
            "current_signal": -52,
            "available_networks": 4,
            "signal_range": "good",
            "current_connection_signal": -52,
            "current_ssid": "workshop"
        }
    });
    let (base_url, mock) = MockNetworkService::ok(&body).await;

    let status = NetworkApi::new(base_url)
        .get_network_status()
        .await
        .expect("status");

    assert_eq!(status.adapter.device, "wlan0");
    assert_eq!(status.adapter.kind, "wifi");
    assert_eq!(status.ip.ipv4, "192.168.1.20");
    assert_eq!(status.signal_info.current_ssid, "workshop");

    let request = mock.only_request();
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.path, "/api/wifi/status");
    assert_eq!(request.content_type.as_deref(), Some("application/json"));
    assert!(request.body.is_empty());
}

#[tokio::test]
async fn test_scan_networks_wraps_network_list() {
    let body = json!([network("workshop", -52), network("guest", -70)]);
    let (base_url, mock) = MockNetworkService::ok(&body).await;

    let scan = NetworkApi::new(base_url)
        .scan_networks()
        .await
        .expect("scan");

    let names: Vec<_> = scan.networks.iter().map(|n| n.ssid.as_str()).collect();
    assert_eq!(names, vec!["workshop", "guest"]);
    assert_eq!(scan.networks[1].signal_strength, -70);

    let request = mock.only_request();
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.path, "/api/wifi/networks");
}

#[tokio::test]
async fn test_available_networks_is_plain_list() {
    let body = json!([network("workshop", -52)]);
    let (base_url, mock) = MockNetworkService::ok(&body).await;

    let networks = NetworkApi::new(base_url)
        .get_available_networks()
        .await
        .expect("networks");

    assert_eq!(networks.len(), 1);
    assert_eq!(networks[0].ssid, "workshop");
    assert_eq!(mock.only_request().path, "/api/wifi/networks");
}

#[tokio::test]
async fn test_connect_to_network_posts_request() {
    let body = json!({
        "success": true,
        "ssid": "workshop",
        "message": "Connected",
        "status": "connected",
        "current_connection": "workshop",
        "previous_connection": null
    });
    let (base_url, mock) = MockNetworkService::ok(&body).await;

    let result = NetworkApi::new(base_url)
        .connect_to_network(&WifiConnectionRequest {
            ssid: "workshop".to_string(),
            password: Some("hunter22".to_string()),
        })
        .await
        .expect("connect");

    assert!(result.success);
    assert_eq!(result.current_connection.as_deref(), Some("workshop"));
    assert!(result.previous_connection.is_none());

    let request = mock.only_request();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "/api/wifi/connect");
    assert_eq!(request.content_type.as_deref(), Some("application/json"));
    assert_eq!(
        request.json(),
        json!({"ssid": "workshop", "password": "hunter22"})
    );
}

#[tokio::test]
async fn test_disconnect_network() {
    let body = json!({"success": true, "message": "Disconnected"});
    let (base_url, mock) = MockNetworkService::ok(&body).await;

    let response = NetworkApi::new(base_url)
        .disconnect_network()
        .await
        .expect("disconnect");

    assert!(response.success);
    assert_eq!(response.message.as_deref(), Some("Disconnected"));
    assert!(response.data.is_none());

    let request = mock.only_request();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "/api/wifi/disconnect");
}

#[tokio::test]
async fn test_validation_error_surfaces_first_message() {
    let body = json!({
        "detail": [
            {"loc": ["body", "ssid"], "msg": "field required", "type": "value_error.missing"}
        ]
    });
    let (base_url, _mock) = MockNetworkService::start(Reply::Body(
        StatusCode::UNPROCESSABLE_ENTITY,
        body.to_string(),
    ))
    .await;

    let err = NetworkApi::new(base_url)
        .connect_to_network(&WifiConnectionRequest {
            ssid: String::new(),
            password: None,
        })
        .await
        .expect_err("rejected");

    assert_eq!(err.to_string(), "field required");
    match err {
        LinkError::Api { status, detail, .. } => {
            assert_eq!(status, Some(422));
            assert_eq!(detail.map(|d| d.detail.len()), Some(1));
        }
        other => unreachable!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_without_detail() {
    let (base_url, _mock) = MockNetworkService::start(Reply::Body(
        StatusCode::INTERNAL_SERVER_ERROR,
        "not json".to_string(),
    ))
    .await;

    let err = NetworkApi::new(base_url)
        .get_available_networks()
        .await
        .expect_err("server error");

    assert_eq!(err.to_string(), "HTTP 500 - Internal Server Error");
}

#[tokio::test]
async fn test_unreadable_error_body_falls_back_to_status_line() {
    let (base_url, mock) =
        MockNetworkService::start(Reply::Truncated(StatusCode::SERVICE_UNAVAILABLE)).await;

    let err = NetworkApi::new(base_url)
        .scan_networks()
        .await
        .expect_err("server error");

    assert_eq!(err.to_string(), "HTTP 503 - Service Unavailable");
    match err {
        LinkError::Api { status, detail, .. } => {
            assert_eq!(status, Some(503));
            assert!(detail.is_none());
        }
        other => unreachable!("unexpected error: {other:?}"),
    }
    assert_eq!(mock.only_request().path, "/api/wifi/networks");
}

#[tokio::test]
async fn test_unreachable_service() {
    let base_url = {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        format!("http://{}", listener.local_addr().expect("addr"))
    };

    let err = NetworkApi::new(base_url)
        .get_network_status()
        .await
        .expect_err("nothing listening");

    assert!(matches!(err, LinkError::ServiceUnreachable));
    assert_eq!(
        err.to_string(),
        "Failed to connect to the network service. Please check if the service is running."
    );
}

#[tokio::test]
async fn test_malformed_success_body() {
    let (base_url, _mock) = MockNetworkService::ok(&json!({"unexpected": true})).await;

    let err = NetworkApi::new(base_url)
        .get_network_status()
        .await
        .expect_err("bad body");

    assert!(err.to_string().starts_with("Network request failed:"));
}
