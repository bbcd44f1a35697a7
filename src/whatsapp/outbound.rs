//! Outbound payload construction.
//!
//! Turns runtime replies into gateway payloads. Questions are flattened to
//! text because the gateway only delivers plain messages. Low-level sends
//! merge caller parameters over a default recipient before being parsed
//! back into a typed [`OutboundPayload`].

use serde_json::{Map, Value};

use super::WhatsAppError;
use crate::config::QuestionStyle;
use crate::types::{OutgoingReply, QuestionOption};

/// Wire key holding the recipient.
pub const RECIPIENT_KEY: &str = "msisdn";

/// Payload discriminator selecting the send endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadType {
    /// Text message, posted to `/send/text`.
    Text,
    /// Any other discriminator value. Cannot be sent.
    Other(String),
}

impl PayloadType {
    /// Parse a discriminator value.
    pub fn parse(value: &str) -> Self {
        match value {
            "text" => Self::Text,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Discriminator string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Other(other) => other,
        }
    }

    /// Endpoint path for this payload type.
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::UnsupportedPayloadType`] for anything but text.
    pub fn endpoint(&self) -> Result<&'static str, WhatsAppError> {
        match self {
            Self::Text => Ok("send/text"),
            Self::Other(other) => Err(WhatsAppError::UnsupportedPayloadType(other.clone())),
        }
    }
}

impl std::fmt::Display for PayloadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gateway send, ready for [`super::client::GatewayClient::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundPayload {
    /// Recipient JID or phone number.
    pub recipient: String,
    /// Message body.
    pub message: String,
    /// Discriminator selecting the endpoint.
    pub kind: PayloadType,
    /// Additional caller-supplied fields, posted as-is.
    pub extra: Map<String, Value>,
}

impl OutboundPayload {
    /// Text payload.
    pub fn text(recipient: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            message: message.into(),
            kind: PayloadType::Text,
            extra: Map::new(),
        }
    }

    /// Build the payload for a runtime reply.
    pub fn build(reply: &OutgoingReply, recipient: &str, style: QuestionStyle) -> Self {
        let message = match reply {
            OutgoingReply::PlainText { text } => text.clone(),
            OutgoingReply::Question { text, options } => render_question(text, options, style),
        };
        Self::text(recipient, message)
    }

    /// Parse merged low-level parameters.
    ///
    /// The recipient is read from `recipient`, then `msisdn`; the type from
    /// `type`, defaulting to text. Remaining keys are kept in
    /// [`OutboundPayload::extra`].
    ///
    /// # Errors
    ///
    /// Returns [`WhatsAppError::InvalidPayload`] when the recipient or
    /// message is missing or not a string.
    pub fn from_parameters(mut params: Map<String, Value>) -> Result<Self, WhatsAppError> {
        let recipient = match params.remove("recipient") {
            Some(value) => {
                params.remove(RECIPIENT_KEY);
                Some(value)
            }
            None => params.remove(RECIPIENT_KEY),
        };
        let recipient = scalar_string(recipient, RECIPIENT_KEY)?;
        let message = scalar_string(params.remove("message"), "message")?;
        let kind = match params.remove("type") {
            None | Some(Value::Null) => PayloadType::Text,
            Some(Value::String(s)) => PayloadType::parse(&s),
            Some(other) => {
                return Err(WhatsAppError::InvalidPayload(format!(
                    "type must be a string, got {other}"
                )))
            }
        };

        Ok(Self {
            recipient,
            message,
            kind,
            extra: params,
        })
    }

    /// JSON body posted to the gateway.
    pub fn to_json(&self) -> Value {
        let mut body = self.extra.clone();
        body.insert(
            RECIPIENT_KEY.to_owned(),
            Value::String(self.recipient.clone()),
        );
        body.insert("message".to_owned(), Value::String(self.message.clone()));
        Value::Object(body)
    }
}

fn scalar_string(value: Option<Value>, name: &str) -> Result<String, WhatsAppError> {
    match value {
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(WhatsAppError::InvalidPayload(format!(
            "{name} must be a string, got {other}"
        ))),
        None => Err(WhatsAppError::InvalidPayload(format!("missing {name}"))),
    }
}

/// Flatten a question into text: the question, then one line per option.
///
/// A question without options is sent as its bare text.
pub fn render_question(text: &str, options: &[QuestionOption], style: QuestionStyle) -> String {
    if options.is_empty() {
        return text.to_owned();
    }

    let lines: Vec<String> = options
        .iter()
        .map(|option| render_option(option, style))
        .collect();
    format!("{text}\n{}", lines.join("\n"))
}

fn render_option(option: &QuestionOption, style: QuestionStyle) -> String {
    let QuestionOption { value, label } = option;
    match style {
        QuestionStyle::Plain => format!("{value} - {label}"),
        QuestionStyle::Rich => {
            bold_whole_token(label, value).unwrap_or_else(|| format!("*{value}* - {label}"))
        }
    }
}

/// Bold every occurrence of `value` in `label` that is not part of a
/// longer word or number. `None` when there is no such occurrence.
fn bold_whole_token(label: &str, value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(label.len() + 4);
    let mut last = 0;
    let mut found = false;
    for (start, _) in label.match_indices(value) {
        let end = start + value.len();
        let before = label[..start].chars().next_back();
        let after = label[end..].chars().next();
        if before.is_some_and(char::is_alphanumeric) || after.is_some_and(char::is_alphanumeric) {
            continue;
        }
        out.push_str(&label[last..start]);
        out.push('*');
        out.push_str(value);
        out.push('*');
        last = end;
        found = true;
    }
    if !found {
        return None;
    }
    out.push_str(&label[last..]);
    Some(out)
}

/// Merge `overlay` into `base`.
///
/// Objects merge key by key, arrays concatenate, anything else is
/// replaced by the overlay.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(source)) => target.extend(source),
        (slot, value) => *slot = value,
    }
}
