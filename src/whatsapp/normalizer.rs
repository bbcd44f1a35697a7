//! Turn a decoded webhook into canonical incoming messages.
//!
//! Image events need the picture itself, so normalization fetches it from
//! the gateway before the message is handed to the runtime.

use tracing::{debug, warn};

use super::client::GatewayClient;
use super::events::{EventContent, GatewayEvent};
use super::WhatsAppError;
use crate::config::WireFormat;
use crate::types::{Attachment, IncomingMessage, RawEvent, IMAGE_PATTERN, LOCATION_PATTERN};

/// Normalize a raw event into zero or one canonical messages.
///
/// Unsupported event types produce no message and are only logged.
///
/// # Errors
///
/// Returns [`WhatsAppError::Decode`] for malformed events, and any error of
/// [`GatewayClient::fetch_file`] for image events.
pub async fn normalize(
    raw: &RawEvent,
    format: WireFormat,
    client: &GatewayClient,
) -> Result<Vec<IncomingMessage>, WhatsAppError> {
    let event = GatewayEvent::decode(raw, format)?;

    let (text, attachment) = match event.content {
        EventContent::Text(text) => (text, None),
        EventContent::Image { data_id } => {
            debug!(%data_id, "resolving image attachment");
            let url = client.fetch_image_data_uri(&data_id).await?;
            (IMAGE_PATTERN.to_owned(), Some(Attachment::Image { url }))
        }
        EventContent::Location {
            latitude,
            longitude,
        } => (
            LOCATION_PATTERN.to_owned(),
            Some(Attachment::Location {
                latitude,
                longitude,
            }),
        ),
        EventContent::Unsupported { message_type } => {
            warn!(
                message_type = message_type.as_deref().unwrap_or("<none>"),
                "dropping webhook event of unrecognized type"
            );
            return Ok(Vec::new());
        }
    };

    let sender = event.sender.ok_or(WhatsAppError::MissingSenderIdentity)?;
    let mut message = IncomingMessage::new(text, sender.clone(), sender, raw.clone())
        .with_message_id(event.message_id);
    if let Some(attachment) = attachment {
        message = message.with_attachment(attachment);
    }
    Ok(vec![message])
}
