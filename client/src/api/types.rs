//! Request and response shapes for the gateway endpoints.
//!
//! Response types are lenient: missing fields default, ids arrive as numbers
//! or numeric strings, and timestamps stay as the raw server text for the
//! formatters to interpret.

use serde::{Deserialize, Deserializer, Serialize};

use super::UploadFile;

pub use crate::session::Profile;

// =============================================================================
// LENIENT DECODING
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

fn loose_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(loose_opt_i64(deserializer)?.unwrap_or_default())
}

#[allow(clippy::cast_possible_truncation)]
fn loose_opt_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Int(n)) => Some(n),
        Some(Loose::Float(f)) => Some(f as i64),
        Some(Loose::Text(s)) => s.trim().parse().ok(),
        Some(Loose::Bool(_)) | None => None,
    })
}

fn loose_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Int(n)) => Some(n.to_string()),
        Some(Loose::Float(f)) => Some(f.to_string()),
        Some(Loose::Text(s)) if !s.is_empty() => Some(s),
        Some(Loose::Bool(b)) => Some(b.to_string()),
        Some(Loose::Text(_)) | None => None,
    })
}

/// Tags arrive comma-separated or as an array.
fn tag_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        List(Vec<String>),
        Joined(String),
    }
    Ok(match Option::<Tags>::deserialize(deserializer)? {
        Some(Tags::List(tags)) => tags,
        Some(Tags::Joined(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
        None => Vec::new(),
    })
}

// =============================================================================
// USER
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "loose_i64")]
    pub user_id: i64,
}

/// Registration may or may not log the user in directly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RegisterData {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "loose_opt_i64")]
    pub user_id: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AvatarData {
    #[serde(default, alias = "avatar", alias = "url")]
    pub avatar_url: Option<String>,
}

// =============================================================================
// VIDEO
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Video {
    #[serde(deserialize_with = "loose_i64")]
    pub id: i64,
    #[serde(alias = "author_id", deserialize_with = "loose_i64")]
    pub user_id: i64,
    #[serde(alias = "play_url")]
    pub video_url: String,
    pub cover_url: String,
    pub title: String,
    pub description: String,
    pub duration: u64,
    pub category: String,
    #[serde(deserialize_with = "tag_list")]
    pub tags: Vec<String>,
    #[serde(alias = "views", deserialize_with = "loose_i64")]
    pub visit_count: i64,
    #[serde(deserialize_with = "loose_i64")]
    pub like_count: i64,
    #[serde(deserialize_with = "loose_i64")]
    pub comment_count: i64,
    pub is_private: bool,
    #[serde(deserialize_with = "loose_text", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Profile>,
}

/// One page of videos plus the server's total count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VideoPage {
    pub videos: Vec<Video>,
    pub total: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoListQuery {
    pub user_id: Option<i64>,
    pub page: u32,
    pub size: u32,
    pub category: String,
}

impl Default for VideoListQuery {
    fn default() -> Self {
        Self { user_id: None, page: 1, size: 10, category: String::new() }
    }
}

/// Cursor-paged hot list; pass the last item's counters to continue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HotQuery {
    pub limit: u32,
    pub category: Option<String>,
    pub last_visit: Option<i64>,
    pub last_like: Option<i64>,
    pub last_id: Option<i64>,
}

impl Default for HotQuery {
    fn default() -> Self {
        Self { limit: 10, category: None, last_visit: None, last_like: None, last_id: None }
    }
}

impl HotQuery {
    /// Query for the page after `last`.
    #[must_use]
    pub fn after(&self, last: &Video) -> Self {
        Self {
            last_visit: Some(last.visit_count),
            last_like: Some(last.like_count),
            last_id: Some(last.id),
            ..self.clone()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub keywords: String,
    pub page_size: u32,
    pub page_num: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl SearchQuery {
    #[must_use]
    pub fn new(keywords: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into(),
            page_size: 10,
            page_num: 1,
            from_date: None,
            to_date: None,
            username: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SemanticQuery {
    pub query: String,
    pub page_size: u32,
    pub page_num: u32,
    pub threshold: f64,
}

impl SemanticQuery {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), page_size: 10, page_num: 1, threshold: 0.3 }
    }
}

/// Semantic search answer: matches plus an optional generated summary.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SemanticResult {
    #[serde(alias = "results")]
    pub videos: Vec<Video>,
    pub summary: String,
    pub related_queries: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoUpload {
    pub file: UploadFile,
    pub title: String,
    pub description: String,
    pub category: String,
    pub tags: Vec<String>,
    pub is_private: bool,
}

// =============================================================================
// SOCIAL
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PrivateMessage {
    #[serde(deserialize_with = "loose_i64")]
    pub id: i64,
    #[serde(deserialize_with = "loose_i64")]
    pub sender_id: i64,
    #[serde(deserialize_with = "loose_i64")]
    pub receiver_id: i64,
    pub content: String,
    pub is_read: bool,
    #[serde(deserialize_with = "loose_text")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChatRoomMember {
    #[serde(deserialize_with = "loose_i64")]
    pub id: i64,
    #[serde(deserialize_with = "loose_i64")]
    pub room_id: i64,
    #[serde(deserialize_with = "loose_i64")]
    pub user_id: i64,
    pub nickname: String,
    pub role: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChatRoom {
    #[serde(deserialize_with = "loose_i64")]
    pub id: i64,
    pub name: String,
    #[serde(deserialize_with = "loose_i64")]
    pub creator_id: i64,
    #[serde(rename = "type")]
    pub kind: i64,
    pub members: Vec<ChatRoomMember>,
    #[serde(deserialize_with = "loose_text")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
    #[serde(deserialize_with = "loose_i64")]
    pub id: i64,
    #[serde(deserialize_with = "loose_i64")]
    pub room_id: i64,
    #[serde(deserialize_with = "loose_i64")]
    pub sender_id: i64,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(deserialize_with = "loose_text")]
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewChatRoom {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: i64,
    pub member_ids: Vec<i64>,
}

/// A friend as listed on the home page and the friends view.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Friendship {
    #[serde(deserialize_with = "loose_i64")]
    pub id: i64,
    #[serde(deserialize_with = "loose_i64")]
    pub user_id: i64,
    #[serde(deserialize_with = "loose_i64")]
    pub friend_id: i64,
    pub status: i64,
    pub remark: String,
    pub username: String,
    #[serde(alias = "avatar")]
    pub avatar_url: Option<String>,
    pub online: bool,
}

impl Friendship {
    /// Remark if set, else username, else the friend id.
    #[must_use]
    pub fn display_name(&self) -> String {
        if !self.remark.is_empty() {
            self.remark.clone()
        } else if !self.username.is_empty() {
            self.username.clone()
        } else {
            format!("用户{}", self.friend_id)
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FriendRequest {
    #[serde(deserialize_with = "loose_i64")]
    pub id: i64,
    #[serde(deserialize_with = "loose_i64")]
    pub sender_id: i64,
    #[serde(deserialize_with = "loose_i64")]
    pub receiver_id: i64,
    pub message: String,
    pub status: i64,
    #[serde(deserialize_with = "loose_text")]
    pub created_at: Option<String>,
}

/// Accept or reject an incoming friend request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestDecision {
    Accept,
    Reject,
}

impl RequestDecision {
    #[must_use]
    pub fn status(self) -> i64 {
        match self {
            Self::Accept => 1,
            Self::Reject => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct UnreadCount {
    #[serde(default, alias = "unread_count", deserialize_with = "loose_i64")]
    pub count: i64,
}
