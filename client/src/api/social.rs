//! `/api/v1/social/*` endpoints: private messages, chat rooms, friends.
//!
//! Every social endpoint requires a session.

use serde_json::{Value, json};

use super::list_field;
use super::types::{
    ChatMessage, ChatRoom, FriendRequest, Friendship, NewChatRoom, PrivateMessage, RequestDecision, UnreadCount,
};
use crate::error::ApiError;
use crate::http::{HttpClient, RequestOptions};

/// Page selection shared by the history endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub size: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, size: 20 }
    }
}

fn authed() -> RequestOptions {
    RequestOptions::new().authenticated()
}

fn paged(page: Page) -> RequestOptions {
    authed().param("page", page.page).param("size", page.size)
}

async fn ack(http: &HttpClient, method: reqwest::Method, path: &str, options: RequestOptions) -> Result<(), ApiError> {
    let _: Value = http.call(method, path, options).await?;
    Ok(())
}

pub mod messages {
    use super::*;

    /// # Errors
    ///
    /// Returns the envelope or transport error from [`HttpClient::call`].
    pub async fn history(http: &HttpClient, other_user: i64, page: Page) -> Result<Vec<PrivateMessage>, ApiError> {
        let options = paged(page).param("receiver_id", other_user);
        list_field(http.get("/api/v1/social/private/messages", options).await?, "messages")
    }

    /// # Errors
    ///
    /// Returns the envelope or transport error from [`HttpClient::call`].
    pub async fn mark_read(http: &HttpClient, message_id: i64) -> Result<(), ApiError> {
        ack(
            http,
            reqwest::Method::POST,
            "/api/v1/social/message/read",
            authed().json(json!({ "message_id": message_id })),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns the envelope or transport error from [`HttpClient::call`].
    pub async fn unread_count(http: &HttpClient) -> Result<i64, ApiError> {
        let data: Value = http.get("/api/v1/social/message/unread/count", authed()).await?;
        if let Some(count) = data.as_i64() {
            return Ok(count);
        }
        if data.is_null() {
            return Ok(0);
        }
        Ok(serde_json::from_value::<UnreadCount>(data)?.count)
    }
}

pub mod rooms {
    use super::*;

    /// # Errors
    ///
    /// Returns the envelope or transport error from [`HttpClient::call`].
    pub async fn create(http: &HttpClient, room: &NewChatRoom) -> Result<ChatRoom, ApiError> {
        let body = serde_json::to_value(room)?;
        let data: Option<ChatRoom> = http.post("/api/v1/social/chatroom", authed().json(body)).await?;
        Ok(data.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns the envelope or transport error from [`HttpClient::call`].
    pub async fn list(http: &HttpClient, page: Page) -> Result<Vec<ChatRoom>, ApiError> {
        list_field(http.get("/api/v1/social/chatrooms", paged(page)).await?, "rooms")
    }

    /// # Errors
    ///
    /// Returns the envelope or transport error from [`HttpClient::call`].
    pub async fn detail(http: &HttpClient, room_id: i64) -> Result<ChatRoom, ApiError> {
        let data: Option<ChatRoom> = http.get(&format!("/api/v1/social/chatroom/{room_id}"), authed()).await?;
        Ok(data.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Returns the envelope or transport error from [`HttpClient::call`].
    pub async fn history(http: &HttpClient, room_id: i64, page: Page) -> Result<Vec<ChatMessage>, ApiError> {
        let path = format!("/api/v1/social/chatroom/{room_id}/messages");
        list_field(http.get(&path, paged(page)).await?, "messages")
    }

    /// # Errors
    ///
    /// Returns the envelope or transport error from [`HttpClient::call`].
    pub async fn set_member_role(http: &HttpClient, room_id: i64, user_id: i64, role: i64) -> Result<(), ApiError> {
        ack(
            http,
            reqwest::Method::PUT,
            "/api/v1/social/chatroom/member/role",
            authed().json(json!({ "room_id": room_id, "user_id": user_id, "role": role })),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns the envelope or transport error from [`HttpClient::call`].
    pub async fn remove_member(http: &HttpClient, room_id: i64, user_id: i64) -> Result<(), ApiError> {
        ack(
            http,
            reqwest::Method::POST,
            "/api/v1/social/chatroom/member/remove",
            authed().json(json!({ "room_id": room_id, "user_id": user_id })),
        )
        .await
    }
}

pub mod friends {
    use super::*;

    /// # Errors
    ///
    /// Returns the envelope or transport error from [`HttpClient::call`].
    pub async fn list(http: &HttpClient) -> Result<Vec<Friendship>, ApiError> {
        list_field(http.get("/api/v1/social/friends", authed()).await?, "friends")
    }

    /// # Errors
    ///
    /// Returns the envelope or transport error from [`HttpClient::call`].
    pub async fn send_request(http: &HttpClient, receiver_id: i64, message: &str) -> Result<(), ApiError> {
        ack(
            http,
            reqwest::Method::POST,
            "/api/v1/social/friend",
            authed().json(json!({ "receiver_id": receiver_id, "message": message })),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns the envelope or transport error from [`HttpClient::call`].
    pub async fn requests(http: &HttpClient, status: Option<i64>) -> Result<Vec<FriendRequest>, ApiError> {
        let options = authed().param_opt("status", status);
        list_field(http.get("/api/v1/social/friend/requests", options).await?, "requests")
    }

    /// # Errors
    ///
    /// Returns the envelope or transport error from [`HttpClient::call`].
    pub async fn handle_request(http: &HttpClient, request_id: i64, decision: RequestDecision) -> Result<(), ApiError> {
        ack(
            http,
            reqwest::Method::POST,
            "/api/v1/social/friend/request/handle",
            authed().json(json!({ "request_id": request_id, "status": decision.status() })),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns the envelope or transport error from [`HttpClient::call`].
    pub async fn update_remark(http: &HttpClient, friend_id: i64, remark: &str) -> Result<(), ApiError> {
        ack(
            http,
            reqwest::Method::PUT,
            "/api/v1/social/friend/remark",
            authed().json(json!({ "friend_id": friend_id, "remark": remark })),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns the envelope or transport error from [`HttpClient::call`].
    pub async fn delete(http: &HttpClient, friend_id: i64) -> Result<(), ApiError> {
        ack(
            http,
            reqwest::Method::DELETE,
            &format!("/api/v1/social/friend/{friend_id}"),
            authed(),
        )
        .await
    }
}
