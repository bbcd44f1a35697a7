//! Host-facing driver for the Whatsappgo gateway.
//!
//! The bot runtime owns the HTTP server and the conversation engine. For
//! each webhook it asks [`WhatsAppGoDriver::matches_request`], then
//! [`WhatsAppGoDriver::messages`]; replies come back through
//! [`WhatsAppGoDriver::reply`] or the lower-level send methods.
//!
//! The driver holds only the immutable config and a client, so a single
//! instance can serve concurrent webhooks.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use super::classifier;
use super::client::{GatewayClient, GatewayResponse, GatewayTransport};
use super::events::participant_id;
use super::normalizer;
use super::outbound::{deep_merge, OutboundPayload, RECIPIENT_KEY};
use super::payload::{self, WebhookRequest};
use super::WhatsAppError;
use crate::config::GatewayConfig;
use crate::types::{Answer, IncomingMessage, OutgoingReply, RawEvent, User};

/// Adapter between the bot runtime and the Whatsappgo gateway.
#[derive(Debug, Clone)]
pub struct WhatsAppGoDriver {
    config: Arc<GatewayConfig>,
    client: GatewayClient,
}

impl WhatsAppGoDriver {
    /// Driver name used for registration with the runtime.
    pub const NAME: &'static str = "Whatsappgo";

    /// Create a driver that talks to the gateway over HTTP.
    pub fn new(config: GatewayConfig) -> Self {
        let config = Arc::new(config);
        let client = GatewayClient::with_http(Arc::clone(&config));
        Self { config, client }
    }

    /// Create a driver over a custom transport.
    pub fn with_transport(config: GatewayConfig, transport: Arc<dyn GatewayTransport>) -> Self {
        let config = Arc::new(config);
        let client = GatewayClient::new(Arc::clone(&config), transport);
        Self { config, client }
    }

    /// Driver name.
    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// Configuration in use.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Whether a gateway token is configured. Sends fail without one.
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Gateway webhooks only carry messages from people.
    pub fn is_bot(&self) -> bool {
        false
    }

    /// Decode a webhook body with the configured wire format.
    pub fn decode(&self, request: &WebhookRequest) -> RawEvent {
        payload::decode(request, self.config.wire_format)
    }

    /// Whether this driver owns the decoded webhook.
    pub fn matches_request(&self, raw: &RawEvent) -> bool {
        classifier::matches(raw, self.config.wire_format)
    }

    /// Canonical messages carried by the webhook.
    ///
    /// # Errors
    ///
    /// See [`normalizer::normalize`].
    pub async fn messages(&self, raw: &RawEvent) -> Result<Vec<IncomingMessage>, WhatsAppError> {
        normalizer::normalize(raw, self.config.wire_format, &self.client).await
    }

    /// The participant who sent `message`.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::MissingSenderIdentity`] when the webhook
    /// has no participant identifier.
    pub fn user(&self, raw: &RawEvent, message: &IncomingMessage) -> Result<User, WhatsAppError> {
        let participant = participant_id(raw, self.config.wire_format)
            .ok_or(WhatsAppError::MissingSenderIdentity)?;
        Ok(User {
            id: message.sender().to_owned(),
            first_name: Some(participant.to_owned()),
            last_name: None,
            username: Some(message.sender().to_owned()),
        })
    }

    /// Wrap a message as the answer to a pending question.
    pub fn conversation_answer(&self, message: &IncomingMessage) -> Answer {
        Answer::from_message(message.clone())
    }

    /// Build the gateway payload answering `matching`.
    pub fn build_service_payload(
        &self,
        reply: &OutgoingReply,
        matching: &IncomingMessage,
    ) -> OutboundPayload {
        OutboundPayload::build(reply, matching.sender(), self.config.question_style)
    }

    /// Send a prepared payload.
    ///
    /// # Errors
    ///
    /// See [`GatewayClient::send`].
    pub async fn send_payload(
        &self,
        payload: &OutboundPayload,
    ) -> Result<GatewayResponse, WhatsAppError> {
        self.client.send(payload).await
    }

    /// Build and send the reply to `matching`.
    ///
    /// # Errors
    ///
    /// See [`GatewayClient::send`].
    pub async fn reply(
        &self,
        reply: &OutgoingReply,
        matching: &IncomingMessage,
    ) -> Result<GatewayResponse, WhatsAppError> {
        let payload = self.build_service_payload(reply, matching);
        self.send_payload(&payload).await
    }

    /// Low-level send with caller-supplied parameters.
    ///
    /// Defaults the recipient to `matching`'s conversation; caller
    /// parameters win on conflicts.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::InvalidPayload`] if the merged parameters do
    /// not form a payload, otherwise see [`GatewayClient::send`].
    pub async fn send_request(
        &self,
        parameters: Map<String, Value>,
        matching: &IncomingMessage,
    ) -> Result<GatewayResponse, WhatsAppError> {
        let mut merged = Value::Object(Map::from_iter([(
            RECIPIENT_KEY.to_owned(),
            Value::String(matching.recipient().to_owned()),
        )]));
        deep_merge(&mut merged, Value::Object(parameters));

        let Value::Object(params) = merged else {
            return Err(WhatsAppError::InvalidPayload(
                "merged parameters are not an object".to_owned(),
            ));
        };
        let payload = OutboundPayload::from_parameters(params)?;
        self.send_payload(&payload).await
    }

    /// Typing indicator. The gateway has no endpoint for it.
    pub fn types(&self, matching: &IncomingMessage) {
        debug!(recipient = matching.recipient(), "typing indicator not supported by gateway");
    }
}
