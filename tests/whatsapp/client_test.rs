//! Gateway client tests over a real socket and a recording transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use whatsappgo::config::GatewayConfig;
use whatsappgo::whatsapp::client::{
    GatewayClient, GatewayRequest, GatewayResponse, GatewayTransport,
};
use whatsappgo::whatsapp::outbound::{OutboundPayload, PayloadType};
use whatsappgo::whatsapp::WhatsAppError;

use crate::support::{configured, serve_once, RecordingTransport, TOKEN};

fn http_client(base_url: &str) -> GatewayClient {
    GatewayClient::with_http(Arc::new(GatewayConfig::new(TOKEN, base_url)))
}

async fn received(rx: tokio::sync::oneshot::Receiver<String>) -> String {
    match rx.await {
        Ok(request) => request,
        Err(err) => panic!("server should report the request: {err}"),
    }
}

#[tokio::test]
async fn send_posts_json_with_bearer_token() {
    let (url, rx) = serve_once("200 OK", br#"{"success":true}"#).await;
    let client = http_client(&url);

    let resp = client
        .send(&OutboundPayload::text("5511999", "hi"))
        .await
        .expect("send should succeed");
    assert_eq!(resp.status, 200);

    let request = received(rx).await;
    let lower = request.to_ascii_lowercase();
    assert!(request.starts_with("POST /send/text HTTP/1.1"), "got: {request}");
    assert!(lower.contains(&format!("authorization: bearer {TOKEN}")));
    assert!(lower.contains("content-type: application/json"));

    let body = request.split("\r\n\r\n").nth(1).unwrap_or_default();
    let json: serde_json::Value = serde_json::from_str(body).expect("body should be JSON");
    assert_eq!(json["msisdn"], "5511999");
    assert_eq!(json["message"], "hi");
}

#[tokio::test]
async fn fetch_file_posts_to_file_endpoint_and_returns_bytes() {
    let (url, rx) = serve_once("200 OK", b"\x00\x01binary").await;
    let client = http_client(&url);

    let bytes = client.fetch_file("abc").await.expect("fetch should succeed");
    assert_eq!(bytes, b"\x00\x01binary");

    let request = received(rx).await;
    assert!(request.starts_with("POST /file/abc HTTP/1.1"), "got: {request}");
    assert!(request
        .to_ascii_lowercase()
        .contains(&format!("authorization: bearer {TOKEN}")));
}

#[tokio::test]
async fn non_success_status_becomes_error() {
    let (url, _rx) = serve_once("503 Service Unavailable", b"gateway   offline").await;
    let client = http_client(&url);

    match client.send(&OutboundPayload::text("1", "x")).await {
        Err(WhatsAppError::HttpStatus { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "gateway offline");
        }
        other => panic!("expected HttpStatus error, got: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_gateway_is_a_transport_error() {
    let client = http_client("http://127.0.0.1:1");
    let result = client.send(&OutboundPayload::text("1", "x")).await;
    assert!(matches!(result, Err(WhatsAppError::Http(_))));
}

#[tokio::test]
async fn empty_token_never_reaches_the_wire() {
    let transport = RecordingTransport::ok();
    let config = GatewayConfig::new("", "http://gateway.test");
    assert!(!config.is_configured());
    let client = GatewayClient::new(Arc::new(config), transport.clone());

    let send = client.send(&OutboundPayload::text("1", "x")).await;
    let fetch = client.fetch_file("abc").await;

    assert!(matches!(send, Err(WhatsAppError::MissingCredential)));
    assert!(matches!(fetch, Err(WhatsAppError::MissingCredential)));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn unsupported_type_never_reaches_the_wire() {
    let transport = RecordingTransport::ok();
    let client = GatewayClient::new(Arc::new(configured()), transport.clone());
    let mut payload = OutboundPayload::text("1", "x");
    payload.kind = PayloadType::parse("picture");

    let result = client.send(&payload).await;
    assert!(matches!(
        result,
        Err(WhatsAppError::UnsupportedPayloadType(ref kind)) if kind == "picture"
    ));
    assert!(transport.requests().is_empty());
}

/// Transport that never answers within any reasonable time.
struct StalledTransport;

#[async_trait]
impl GatewayTransport for StalledTransport {
    async fn post(&self, _request: GatewayRequest) -> Result<GatewayResponse, WhatsAppError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(GatewayResponse {
            status: 200,
            body: Vec::new(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn stalled_fetch_is_bounded_by_fetch_timeout() {
    let client = GatewayClient::new(Arc::new(configured()), Arc::new(StalledTransport));
    let result = client.fetch_file("abc").await;
    assert!(matches!(result, Err(WhatsAppError::Timeout { secs: 10 })));
}

#[test]
fn file_url_escapes_data_id() {
    let client = GatewayClient::new(Arc::new(configured()), RecordingTransport::ok());
    assert_eq!(client.file_url("abc"), "http://gateway.test/file/abc");
    assert_eq!(client.file_url("a b/c"), "http://gateway.test/file/a%20b%2Fc");
}
