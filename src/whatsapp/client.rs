//! Authenticated HTTP access to the Whatsappgo gateway.
//!
//! All gateway calls go through a [`GatewayTransport`], so hosts and tests
//! can swap the reqwest-backed [`HttpTransport`] for something else. The
//! [`GatewayClient`] adds credentials, endpoint paths and status handling
//! on top.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use tracing::{debug, info, warn};

use super::outbound::OutboundPayload;
use super::WhatsAppError;
use crate::config::GatewayConfig;

/// HTTP connect timeout for the reqwest client.
const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Longest error body kept in [`WhatsAppError::HttpStatus`].
const MAX_ERROR_BODY_CHARS: usize = 256;

/// MIME type assumed for gateway images.
const IMAGE_MIME: &str = "image/png";

/// One POST to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequest {
    /// Absolute URL.
    pub url: String,
    /// Token sent as `Authorization: Bearer ...`.
    pub bearer_token: String,
    /// JSON body, if any.
    pub json: Option<serde_json::Value>,
    /// Per-request timeout overriding the transport default.
    pub timeout: Option<Duration>,
}

/// Raw gateway answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl GatewayResponse {
    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Carries gateway requests over the wire.
///
/// Implementations must be `Send + Sync`; one instance serves all
/// concurrent webhooks.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// Perform an authenticated POST.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::Http`] on network failure. Non-2xx statuses
    /// are returned as a normal response.
    async fn post(&self, request: GatewayRequest) -> Result<GatewayResponse, WhatsAppError>;
}

/// [`GatewayTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport whose requests time out after `timeout` unless a
    /// request sets its own.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to build HTTP client with timeouts, using default");
                reqwest::Client::default()
            });
        Self { client }
    }
}

#[async_trait]
impl GatewayTransport for HttpTransport {
    async fn post(&self, request: GatewayRequest) -> Result<GatewayResponse, WhatsAppError> {
        let mut builder = self
            .client
            .post(&request.url)
            .bearer_auth(&request.bearer_token);
        if let Some(body) = &request.json {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();
        Ok(GatewayResponse { status, body })
    }
}

/// Gateway API client: sends payloads and fetches attachment content.
#[derive(Clone)]
pub struct GatewayClient {
    config: Arc<GatewayConfig>,
    transport: Arc<dyn GatewayTransport>,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Create a client over the given transport.
    pub fn new(config: Arc<GatewayConfig>, transport: Arc<dyn GatewayTransport>) -> Self {
        Self { config, transport }
    }

    /// Create a client over a reqwest transport using the configured timeout.
    pub fn with_http(config: Arc<GatewayConfig>) -> Self {
        let transport = Arc::new(HttpTransport::new(config.request_timeout()));
        Self::new(config, transport)
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Send an outbound payload to the endpoint its type selects.
    ///
    /// Nothing goes on the wire when the token is missing or the payload
    /// type has no endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::MissingCredential`],
    /// [`WhatsAppError::UnsupportedPayloadType`], or a transport/status error.
    pub async fn send(&self, payload: &OutboundPayload) -> Result<GatewayResponse, WhatsAppError> {
        let token = self.config.credential()?;
        let endpoint = payload.kind.endpoint()?;

        let request = GatewayRequest {
            url: self.config.endpoint(endpoint),
            bearer_token: token.to_owned(),
            json: Some(payload.to_json()),
            timeout: None,
        };
        let resp = self.post_checked(request).await?;
        info!(recipient = %payload.recipient, kind = %payload.kind, "message sent via gateway");
        Ok(resp)
    }

    /// Fetch the raw bytes of a gateway-stored file.
    ///
    /// Bounded by the configured fetch timeout, whether or not the
    /// transport honours [`GatewayRequest::timeout`].
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::MissingCredential`], [`WhatsAppError::Timeout`],
    /// or a transport/status error.
    pub async fn fetch_file(&self, data_id: &str) -> Result<Vec<u8>, WhatsAppError> {
        let token = self.config.credential()?;
        let timeout = self.config.fetch_timeout();
        let request = GatewayRequest {
            url: self.file_url(data_id),
            bearer_token: token.to_owned(),
            json: None,
            timeout: Some(timeout),
        };
        let resp = tokio::time::timeout(timeout, self.post_checked(request))
            .await
            .map_err(|_| WhatsAppError::Timeout {
                secs: timeout.as_secs(),
            })??;
        debug!(data_id, bytes = resp.body.len(), "fetched gateway file");
        Ok(resp.body)
    }

    /// Fetch an image and inline it as a `data:image/png;base64,...` URI.
    ///
    /// # Errors
    ///
    /// Same as [`GatewayClient::fetch_file`].
    pub async fn fetch_image_data_uri(&self, data_id: &str) -> Result<String, WhatsAppError> {
        let bytes = self.fetch_file(data_id).await?;
        Ok(image_data_uri(&bytes))
    }

    /// URL of a gateway-stored file.
    pub fn file_url(&self, data_id: &str) -> String {
        let segment: String = url::form_urlencoded::byte_serialize(data_id.as_bytes()).collect();
        self.config
            .endpoint(&format!("file/{}", segment.replace('+', "%20")))
    }

    async fn post_checked(&self, request: GatewayRequest) -> Result<GatewayResponse, WhatsAppError> {
        let url = request.url.clone();
        let resp = self.transport.post(request).await?;
        if !resp.is_success() {
            let body = sanitize_error_body(&resp.text(), self.config.token.as_deref());
            warn!(%url, status = resp.status, "gateway request failed");
            return Err(WhatsAppError::HttpStatus {
                status: resp.status,
                body,
            });
        }
        Ok(resp)
    }
}

/// Inline bytes as a PNG data URI.
pub fn image_data_uri(bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{IMAGE_MIME};base64,{encoded}")
}

fn sanitize_error_body(raw: &str, token: Option<&str>) -> String {
    let mut sanitized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
        sanitized = sanitized.replace(token, "[REDACTED]");
    }

    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}
