//! Typed gateway events decoded from a [`RawEvent`].
//!
//! Decoding validates every field the event kind needs up front, so the
//! normalizer never works with half-populated data.

use serde::Deserialize;
use serde_json::Value;

use super::DecodeError;
use crate::config::WireFormat;
use crate::types::RawEvent;

/// `Info.MessageType` of a text message.
pub const TYPE_TEXT: &str = "text";
/// `Info.MessageType` of an image message.
pub const TYPE_IMAGE: &str = "data/image";
/// `Info.MessageType` of a location message.
pub const TYPE_LOCATION: &str = "location";

/// What an inbound event carries.
#[derive(Debug, Clone, PartialEq)]
pub enum EventContent {
    /// Plain text.
    Text(String),
    /// An image stored on the gateway under `data_id`.
    Image {
        /// Gateway file identifier (the `Data` field).
        data_id: String,
    },
    /// A shared location.
    Location {
        /// Latitude in decimal degrees.
        latitude: f64,
        /// Longitude in decimal degrees.
        longitude: f64,
    },
    /// Anything the adapter cannot turn into a message.
    Unsupported {
        /// The reported message type, if there was one.
        message_type: Option<String>,
    },
}

/// A validated inbound gateway event.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayEvent {
    /// Remote participant identifier. Always present for supported content.
    pub sender: Option<String>,
    /// Gateway-assigned message identifier.
    pub message_id: Option<String>,
    /// Event content.
    pub content: EventContent,
}

impl GatewayEvent {
    /// Decode a raw event in the given wire format.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when a field required by the event kind is
    /// missing or malformed.
    pub fn decode(raw: &RawEvent, format: WireFormat) -> Result<Self, DecodeError> {
        match format {
            WireFormat::Form => decode_form(raw),
            WireFormat::Json => decode_json(raw),
        }
    }

    /// Whether the event can become a canonical message.
    pub fn is_supported(&self) -> bool {
        !matches!(self.content, EventContent::Unsupported { .. })
    }
}

/// Remote participant identifier of a raw event, if it has one.
pub fn participant_id(raw: &RawEvent, format: WireFormat) -> Option<&str> {
    let found = match format {
        WireFormat::Form => field(raw, &["contact", "uid"])
            .or_else(|| field(raw, &["message", "Info", "RemoteJid"]))
            .or_else(|| field(raw, &["Info", "RemoteJid"])),
        WireFormat::Json => field(raw, &["Info", "RemoteJid"]),
    };
    found.filter(|id| !id.trim().is_empty())
}

/// Look up a nested string field by path.
pub(crate) fn field<'a>(raw: &'a RawEvent, path: &[&str]) -> Option<&'a str> {
    let (first, rest) = path.split_first()?;
    let mut current = raw.get(*first)?;
    for key in rest {
        current = current.get(*key)?;
    }
    current.as_str()
}

// ── JSON variant ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct JsonEnvelope {
    #[serde(rename = "Info")]
    info: Option<JsonInfo>,
    #[serde(rename = "Text")]
    text: Option<Value>,
    #[serde(rename = "Data")]
    data: Option<Value>,
    #[serde(rename = "Latitude")]
    latitude: Option<Value>,
    #[serde(rename = "Longitude")]
    longitude: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonInfo {
    #[serde(rename = "RemoteJid")]
    remote_jid: Option<Value>,
    #[serde(rename = "Id")]
    id: Option<Value>,
    #[serde(rename = "MessageType")]
    message_type: Option<Value>,
}

fn decode_json(raw: &RawEvent) -> Result<GatewayEvent, DecodeError> {
    let envelope: JsonEnvelope = serde_json::from_value(Value::Object(raw.clone()))
        .map_err(|e| DecodeError::InvalidField {
            field: "event",
            reason: e.to_string(),
        })?;

    let Some(info) = envelope.info else {
        return Ok(GatewayEvent {
            sender: None,
            message_id: None,
            content: EventContent::Unsupported { message_type: None },
        });
    };

    let message_type = scalar(info.message_type.as_ref());
    let content = match message_type.as_deref() {
        Some(TYPE_TEXT) => EventContent::Text(text(envelope.text.as_ref())?),
        Some(TYPE_IMAGE) => EventContent::Image {
            data_id: data_id(envelope.data.as_ref())?,
        },
        Some(TYPE_LOCATION) => EventContent::Location {
            latitude: coordinate(envelope.latitude.as_ref(), "Latitude")?,
            longitude: coordinate(envelope.longitude.as_ref(), "Longitude")?,
        },
        other => EventContent::Unsupported {
            message_type: other.map(str::to_owned),
        },
    };

    let sender = scalar(info.remote_jid.as_ref()).filter(|jid| !jid.trim().is_empty());
    if sender.is_none() && !matches!(content, EventContent::Unsupported { .. }) {
        return Err(DecodeError::MissingField("Info.RemoteJid"));
    }

    Ok(GatewayEvent {
        sender,
        message_id: scalar(info.id.as_ref()),
        content,
    })
}

/// String or number rendered as a string. Anything else counts as absent.
fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> Result<String, DecodeError> {
    match value {
        Some(Value::Null) | None => Err(DecodeError::MissingField("Text")),
        Some(other) => scalar(Some(other)).ok_or_else(|| DecodeError::InvalidField {
            field: "Text",
            reason: "expected a string".to_owned(),
        }),
    }
}

fn data_id(value: Option<&Value>) -> Result<String, DecodeError> {
    let id = match value {
        Some(Value::String(s)) => s.trim().to_owned(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Null) | None => return Err(DecodeError::MissingField("Data")),
        Some(_) => {
            return Err(DecodeError::InvalidField {
                field: "Data",
                reason: "expected a string or number".to_owned(),
            })
        }
    };
    if id.is_empty() {
        return Err(DecodeError::MissingField("Data"));
    }
    Ok(id)
}

fn coordinate(value: Option<&Value>, name: &'static str) -> Result<f64, DecodeError> {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Null) | None => return Err(DecodeError::MissingField(name)),
        Some(_) => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| DecodeError::InvalidField {
            field: name,
            reason: "expected a finite number".to_owned(),
        })
}

// ── Form variant ────────────────────────────────────────────────

fn decode_form(raw: &RawEvent) -> Result<GatewayEvent, DecodeError> {
    if !raw.get("message").is_some_and(Value::is_object) {
        return Err(DecodeError::MissingField("message"));
    }

    let text = field(raw, &["message", "body", "text"])
        .or_else(|| field(raw, &["message", "Text"]))
        .or_else(|| field(raw, &["Text"]))
        .ok_or(DecodeError::MissingField("message.body.text"))?;

    let sender = participant_id(raw, WireFormat::Form)
        .ok_or(DecodeError::MissingField("contact.uid"))?;

    let message_id = field(raw, &["message", "uid"])
        .or_else(|| field(raw, &["message", "Info", "Id"]))
        .or_else(|| field(raw, &["Info", "Id"]))
        .map(str::to_owned);

    Ok(GatewayEvent {
        sender: Some(sender.to_owned()),
        message_id,
        content: EventContent::Text(text.to_owned()),
    })
}
