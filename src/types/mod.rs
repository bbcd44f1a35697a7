//! Canonical message types shared between the adapter and the bot runtime.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decoded webhook body: an untyped mapping of top-level keys.
pub type RawEvent = Map<String, Value>;

/// Text placed in an incoming message that carries only an image.
pub const IMAGE_PATTERN: &str = "%%%_IMAGE_%%%";

/// Text placed in an incoming message that carries only a location.
pub const LOCATION_PATTERN: &str = "%%%_LOCATION_%%%";

/// Media or place attached to an incoming message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attachment {
    /// Image content, inlined as a `data:` URI.
    Image {
        /// `data:image/png;base64,...` URI holding the image bytes.
        url: String,
    },
    /// A shared location.
    Location {
        /// Latitude in decimal degrees.
        latitude: f64,
        /// Longitude in decimal degrees.
        longitude: f64,
    },
    /// Audio clip. Not produced by the gateway yet.
    Audio {
        /// Location of the audio content.
        url: String,
    },
    /// Video clip. Not produced by the gateway yet.
    Video {
        /// Location of the video content.
        url: String,
    },
    /// Generic file. Not produced by the gateway yet.
    File {
        /// Location of the file content.
        url: String,
    },
}

impl Attachment {
    /// The image data URI, if this is an image.
    pub fn image_url(&self) -> Option<&str> {
        match self {
            Self::Image { url } => Some(url),
            _ => None,
        }
    }
}

/// Runtime-neutral representation of one inbound chat event.
///
/// Built once by the normalizer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingMessage {
    text: String,
    sender: String,
    recipient: String,
    message_id: Option<String>,
    payload: RawEvent,
    attachments: Vec<Attachment>,
}

impl IncomingMessage {
    /// Create a message with no attachments.
    pub fn new(
        text: impl Into<String>,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        payload: RawEvent,
    ) -> Self {
        Self {
            text: text.into(),
            sender: sender.into(),
            recipient: recipient.into(),
            message_id: None,
            payload,
            attachments: Vec::new(),
        }
    }

    /// Attach the gateway's message identifier.
    #[must_use]
    pub fn with_message_id(mut self, message_id: Option<String>) -> Self {
        self.message_id = message_id;
        self
    }

    /// Add an attachment.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Message text, or a pattern marker for media-only messages.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Remote participant that sent the message.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Conversation the message belongs to.
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Gateway-assigned message identifier, when the event carried one.
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// The full decoded webhook body.
    pub fn payload(&self) -> &RawEvent {
        &self.payload
    }

    /// Attachments resolved during normalization.
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Image attachments only.
    pub fn images(&self) -> impl Iterator<Item = &Attachment> {
        self.attachments
            .iter()
            .filter(|a| matches!(a, Attachment::Image { .. }))
    }

    /// First location attachment, if any.
    pub fn location(&self) -> Option<(f64, f64)> {
        self.attachments.iter().find_map(|a| match a {
            Attachment::Location {
                latitude,
                longitude,
            } => Some((*latitude, *longitude)),
            _ => None,
        })
    }
}

/// Identity of the remote participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier used for conversation matching.
    pub id: String,
    /// Display name; the gateway only exposes the participant JID.
    pub first_name: Option<String>,
    /// Always empty for this gateway.
    pub last_name: Option<String>,
    /// Username used by the runtime for addressing.
    pub username: Option<String>,
}

/// A user's reply to a pending conversation question.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    text: String,
    message: IncomingMessage,
}

impl Answer {
    /// Wrap an incoming message as an answer.
    pub fn from_message(message: IncomingMessage) -> Self {
        Self {
            text: message.text().to_owned(),
            message,
        }
    }

    /// Answer text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Option value the answer selects: the text with surrounding
    /// whitespace and bold markup removed.
    pub fn value(&self) -> &str {
        self.text.trim().trim_matches('*')
    }

    /// Message that carried the answer.
    pub fn message(&self) -> &IncomingMessage {
        &self.message
    }
}

/// One selectable option of a [`OutgoingReply::Question`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Value the user types to pick this option.
    pub value: String,
    /// Human-readable label.
    pub label: String,
}

impl QuestionOption {
    /// Create an option.
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Reply produced by the runtime for delivery to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutgoingReply {
    /// Free-form text.
    PlainText {
        /// Text delivered verbatim.
        text: String,
    },
    /// Multiple-choice question.
    Question {
        /// Question text.
        text: String,
        /// Options in display order.
        options: Vec<QuestionOption>,
    },
}

impl OutgoingReply {
    /// Plain text reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self::PlainText { text: text.into() }
    }

    /// Question reply.
    pub fn question(text: impl Into<String>, options: Vec<QuestionOption>) -> Self {
        Self::Question {
            text: text.into(),
            options,
        }
    }
}
