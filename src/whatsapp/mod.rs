//! Whatsappgo gateway adapter: webhook decoding, classification,
//! normalization and outbound sends.
//!
//! Inbound flow: [`payload`] decodes the raw body, [`classifier`] decides
//! ownership, [`events`] produces a typed event and [`normalizer`] turns it
//! into canonical messages. Outbound flow: [`outbound`] builds the payload
//! and [`client`] posts it. [`driver::WhatsAppGoDriver`] ties both together
//! for the host runtime.

pub mod classifier;
pub mod client;
pub mod driver;
pub mod events;
pub mod normalizer;
pub mod outbound;
pub mod payload;

pub use driver::WhatsAppGoDriver;

/// Errors from decoding a raw webhook body into a typed event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A field the event kind requires is absent or null.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field is present but has an unusable value.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

/// Errors from the Whatsappgo adapter.
#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    /// The webhook body does not form a valid event.
    #[error("invalid webhook event: {0}")]
    Decode(#[from] DecodeError),

    /// The event carries no remote participant identifier.
    #[error("event has no sender identity")]
    MissingSenderIdentity,

    /// The payload discriminator names a type the gateway cannot send.
    #[error("unsupported payload type: {0}")]
    UnsupportedPayloadType(String),

    /// No gateway token is configured.
    #[error("gateway token is not configured")]
    MissingCredential,

    /// Low-level send parameters do not form a payload.
    #[error("invalid outbound payload: {0}")]
    InvalidPayload(String),

    /// HTTP request to the gateway failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// An attachment fetch did not finish in time.
    #[error("gateway request timed out after {secs}s")]
    Timeout {
        /// Configured limit in seconds.
        secs: u64,
    },

    /// The gateway answered with a non-success status.
    #[error("gateway returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Collapsed, truncated response body.
        body: String,
    },
}
