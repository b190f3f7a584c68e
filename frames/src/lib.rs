//! Shared wire types for the videohub REST envelope and realtime chat frames.
//!
//! Both transports speak JSON. Every HTTP response body is wrapped in an
//! [`Envelope`] carrying an application status next to the payload, and the
//! social websocket exchanges [`ChatFrame`] text messages discriminated by
//! their `type` field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Application status code signalling success inside an [`Envelope`].
pub const SUCCESS_CODE: i64 = 0;

/// Error returned by [`encode_frame`] and [`decode_frame`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text could not be parsed as a chat frame.
    #[error("failed to decode chat frame: {0}")]
    Decode(#[source] serde_json::Error),
    /// The frame could not be serialized.
    #[error("failed to encode chat frame: {0}")]
    Encode(#[source] serde_json::Error),
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// Status block of an [`Envelope`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseStatus {
    /// `0` on success, anything else is an application error.
    #[serde(default)]
    pub code: i64,
    /// User-facing message accompanying `code`.
    #[serde(default)]
    pub msg: String,
}

impl BaseStatus {
    /// Successful status with an empty message.
    #[must_use]
    pub fn ok() -> Self {
        Self { code: SUCCESS_CODE, msg: String::new() }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

/// Uniform `{ base: { code, msg }, data }` response wrapper.
///
/// Some gateway handlers capitalize the status key, so `Base` is accepted on
/// decode. A body without any status block counts as successful.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    #[serde(default, alias = "Base", skip_serializing_if = "Option::is_none")]
    pub base: Option<BaseStatus>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Successful envelope around `data`.
    #[must_use]
    pub fn success(data: T) -> Self {
        Self { base: Some(BaseStatus::ok()), data: Some(data) }
    }

    /// Failed envelope with no payload.
    #[must_use]
    pub fn failure(code: i64, msg: impl Into<String>) -> Self {
        Self {
            base: Some(BaseStatus { code, msg: msg.into() }),
            data: None,
        }
    }

    /// Whether the status block is absent or carries [`SUCCESS_CODE`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.base.as_ref().is_none_or(BaseStatus::is_success)
    }

    /// Split into payload or failing status.
    ///
    /// # Errors
    ///
    /// Returns the [`BaseStatus`] when its code is non-zero.
    pub fn into_result(self) -> Result<Option<T>, BaseStatus> {
        match self.base {
            Some(base) if !base.is_success() => Err(base),
            _ => Ok(self.data),
        }
    }
}

// =============================================================================
// CHAT FRAMES
// =============================================================================

/// Discriminator carried in the `type` field of a [`ChatFrame`].
///
/// Unknown server event types survive a decode/encode cycle as [`FrameKind::Other`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FrameKind {
    /// Direct message between two users.
    Private,
    /// Client-originated room message.
    Chat,
    /// Server-pushed room message.
    Group,
    /// Server notice.
    System,
    /// Incoming friend request notification.
    FriendRequest,
    Other(String),
}

impl FrameKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Private => "private",
            Self::Chat => "chat",
            Self::Group => "group",
            Self::System => "system",
            Self::FriendRequest => "friend_request",
            Self::Other(kind) => kind,
        }
    }
}

impl From<String> for FrameKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "private" => Self::Private,
            "chat" => Self::Chat,
            "group" => Self::Group,
            "system" => Self::System,
            "friend_request" => Self::FriendRequest,
            _ => Self::Other(value),
        }
    }
}

impl From<FrameKind> for String {
    fn from(value: FrameKind) -> Self {
        match value {
            FrameKind::Other(kind) => kind,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message on the social websocket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatFrame {
    #[serde(rename = "type")]
    pub kind: FrameKind,
    /// Sender user id, filled in by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<i64>,
    /// Recipient user id for private messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<i64>,
    /// Chat room id for room messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<i64>,
    #[serde(default)]
    pub content: String,
    /// Event-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,
    /// Seconds since the Unix epoch, filled in by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl ChatFrame {
    /// Bare frame of `kind` with `content` and no routing fields.
    #[must_use]
    pub fn new(kind: FrameKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            from: None,
            to: None,
            room_id: None,
            content: content.into(),
            extra: None,
            timestamp: None,
        }
    }

    /// `{ type: "private", to, content }`
    #[must_use]
    pub fn private(to_user: i64, content: impl Into<String>) -> Self {
        Self {
            to: Some(to_user),
            ..Self::new(FrameKind::Private, content)
        }
    }

    /// `{ type: "chat", content }`
    #[must_use]
    pub fn chat(content: impl Into<String>) -> Self {
        Self::new(FrameKind::Chat, content)
    }
}

/// Serialize a frame to websocket text.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails.
pub fn encode_frame(frame: &ChatFrame) -> Result<String, CodecError> {
    serde_json::to_string(frame).map_err(CodecError::Encode)
}

/// Parse websocket text into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed JSON or a missing `type`.
pub fn decode_frame(text: &str) -> Result<ChatFrame, CodecError> {
    serde_json::from_str(text).map_err(CodecError::Decode)
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
