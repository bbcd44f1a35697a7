//! Decide whether a decoded webhook belongs to this adapter.
//!
//! Several adapters may be registered with the host; each one is asked in
//! turn, so this check is a pure predicate with no side effects.

use tracing::debug;

use super::events::field;
use crate::config::WireFormat;
use crate::types::RawEvent;

/// Keys every form-encoded gateway webhook carries.
pub const REQUIRED_FORM_KEYS: [&str; 5] = ["event", "token", "uid", "contact", "message"];

/// `message[dir]` value of inbound messages.
pub const INBOUND_DIRECTION: &str = "i";

/// Whether the event is an inbound gateway webhook for this adapter.
pub fn matches(raw: &RawEvent, format: WireFormat) -> bool {
    let accepted = match format {
        WireFormat::Form => matches_form(raw),
        WireFormat::Json => matches_json(raw),
    };
    debug!(?format, accepted, "classified webhook");
    accepted
}

/// All required keys present and the message is inbound.
fn matches_form(raw: &RawEvent) -> bool {
    if let Some(missing) = REQUIRED_FORM_KEYS.iter().find(|key| !raw.contains_key(**key)) {
        debug!(missing, "form webhook lacks required key");
        return false;
    }
    field(raw, &["message", "dir"]) == Some(INBOUND_DIRECTION)
}

/// `Info` or `Context` present and non-null.
///
/// This also accepts unrelated JSON that happens to use either key.
fn matches_json(raw: &RawEvent) -> bool {
    let present = |key: &str| raw.get(key).is_some_and(|v| !v.is_null());
    present("Info") || present("Context")
}
