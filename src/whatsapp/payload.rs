//! Webhook body decoding into a [`RawEvent`].
//!
//! The decoder is chosen by the configured [`WireFormat`], never by the
//! request. Malformed bodies decode to an empty mapping so that
//! classification simply fails.
//!
//! Form bodies use bracket notation for nesting (`message[dir]=i`,
//! `contact[uid]=123`, `tags[]=a`), which is expanded into nested JSON
//! objects and arrays.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::WireFormat;
use crate::types::RawEvent;

/// An inbound webhook as received by the host's HTTP server.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    /// Request headers.
    pub headers: HeaderMap,
    /// Raw request body.
    pub body: Vec<u8>,
}

impl WebhookRequest {
    /// Create a request with the given body and no headers.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Add a header. Invalid names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => debug!(header = name, "ignoring invalid webhook header"),
        }
        self
    }

    /// The `Content-Type` header, if present and readable.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// Decode a request body with the configured wire format.
pub fn decode(request: &WebhookRequest, format: WireFormat) -> RawEvent {
    if let Some(content_type) = request.content_type() {
        let expected = match format {
            WireFormat::Form => "application/x-www-form-urlencoded",
            WireFormat::Json => "application/json",
        };
        if !content_type.starts_with(expected) {
            debug!(content_type, expected, "webhook content type differs from configured format");
        }
    }
    match format {
        WireFormat::Form => decode_form(&request.body),
        WireFormat::Json => decode_json(&request.body),
    }
}

/// Decode a JSON body. Anything but a JSON object yields an empty mapping.
pub fn decode_json(body: &[u8]) -> RawEvent {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            debug!(kind = json_kind(&other), "JSON webhook body is not an object");
            RawEvent::new()
        }
        Err(e) => {
            debug!(error = %e, "failed to parse JSON webhook body");
            RawEvent::new()
        }
    }
}

/// Decode an `application/x-www-form-urlencoded` body with bracketed keys.
///
/// Repeated scalar keys keep the last value; `key[]` appends.
pub fn decode_form(body: &[u8]) -> RawEvent {
    let mut event = RawEvent::new();
    for (key, value) in url::form_urlencoded::parse(body) {
        let Some((head, path)) = split_key(&key) else {
            debug!(key = %key, "skipping form field without a name");
            continue;
        };
        let slot = event.entry(head.to_owned()).or_insert(Value::Null);
        assign(slot, &path, Value::String(value.into_owned()));
    }
    event
}

/// Split `a[b][c]` into `("a", ["b", "c"])`. Text after an unterminated
/// bracket is dropped.
fn split_key(key: &str) -> Option<(&str, Vec<&str>)> {
    let Some((head, tail)) = key.split_once('[') else {
        return (!key.is_empty()).then_some((key, Vec::new()));
    };
    if head.is_empty() {
        return None;
    }

    let mut path = Vec::new();
    let mut rest = tail;
    while let Some((segment, after)) = rest.split_once(']') {
        path.push(segment);
        match after.strip_prefix('[') {
            Some(next) => rest = next,
            None => break,
        }
    }
    Some((head, path))
}

fn assign(slot: &mut Value, path: &[&str], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        *slot = value;
        return;
    };

    if first.is_empty() {
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(items) = slot {
            let mut child = Value::Null;
            assign(&mut child, rest, value);
            items.push(child);
        }
        return;
    }

    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    if let Value::Object(map) = slot {
        let child = map.entry((*first).to_owned()).or_insert(Value::Null);
        assign(child, rest, value);
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
