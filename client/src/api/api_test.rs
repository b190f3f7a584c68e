use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Query};
use axum::http::HeaderMap;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use super::types::{HotQuery, RequestDecision, SearchQuery, SemanticQuery, Video, VideoListQuery, VideoUpload};
use super::*;
use crate::error::ErrorKind;
use crate::session::Credentials;
use crate::test_support::{Hits, client_for, ok, serve};

type Captured = Arc<Mutex<Vec<Value>>>;

fn captured(store: &Captured) -> Vec<Value> {
    store.lock().expect("capture lock").clone()
}

// =============================================================================
// Helpers
// =============================================================================

#[test]
fn list_field_accepts_bare_wrapped_and_null() {
    let bare: Vec<i64> = list_field(json!([1, 2]), "items").expect("bare");
    assert_eq!(bare, vec![1, 2]);

    let wrapped: Vec<i64> = list_field(json!({ "items": [3], "total": 1 }), "items").expect("wrapped");
    assert_eq!(wrapped, vec![3]);

    let missing: Vec<i64> = list_field(json!({ "total": 0 }), "items").expect("missing");
    assert!(missing.is_empty());

    let null: Vec<i64> = list_field(Value::Null, "items").expect("null");
    assert!(null.is_empty());
}

#[test]
fn list_field_rejects_mismatched_items() {
    let err = list_field::<i64>(json!(["x"]), "items").expect_err("decode");
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[test]
fn content_type_follows_extension() {
    assert_eq!(content_type_for(Path::new("a/b/clip.MP4")), "video/mp4");
    assert_eq!(content_type_for(Path::new("face.jpeg")), "image/jpeg");
    assert_eq!(content_type_for(Path::new("noext")), "application/octet-stream");
}

#[tokio::test]
async fn upload_file_reads_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("avatar.png");
    std::fs::write(&path, b"png-bytes").expect("write");

    let file = UploadFile::from_path(&path).await.expect("read");
    assert_eq!(file.file_name, "avatar.png");
    assert_eq!(file.content_type, "image/png");
    assert_eq!(file.size(), 9);
}

#[test]
fn video_decodes_server_shapes_leniently() {
    let video: Video = serde_json::from_value(json!({
        "id": "42",
        "user_id": 7,
        "video_url": "http://cdn/v.mp4",
        "title": "cats",
        "tags": "pets, funny,",
        "visit_count": 12345,
        "created_at": "2024-03-01T08:30:00Z",
        "deleted_at": null
    }))
    .expect("video");
    assert_eq!(video.id, 42);
    assert_eq!(video.user_id, 7);
    assert_eq!(video.tags, vec!["pets".to_owned(), "funny".to_owned()]);
    assert_eq!(video.visit_count, 12_345);
    assert_eq!(video.created_at.as_deref(), Some("2024-03-01T08:30:00Z"));
    assert_eq!(video.like_count, 0);
}

#[test]
fn hot_query_cursor_follows_last_video() {
    let last = Video { id: 9, visit_count: 100, like_count: 5, ..Video::default() };
    let next = HotQuery::default().after(&last);
    assert_eq!(next.limit, 10);
    assert_eq!((next.last_visit, next.last_like, next.last_id), (Some(100), Some(5), Some(9)));
}

// =============================================================================
// User endpoints
// =============================================================================

#[tokio::test]
async fn login_posts_credentials_as_json() {
    let bodies = Captured::default();
    let sink = bodies.clone();
    let router = Router::new().route(
        "/api/v1/user/login",
        post(move |Json(body): Json<Value>| {
            let sink = sink.clone();
            async move {
                sink.lock().expect("capture lock").push(body);
                ok(json!({ "token": "t", "refresh_token": "r", "user_id": "12" }))
            }
        }),
    );
    let (client, _) = client_for(&serve(router).await);

    let credentials = Credentials { username: "alice".to_owned(), password: "pw".to_owned() };
    let data = user::login(&client.http, &credentials).await.expect("login");

    assert_eq!(data.token, "t");
    assert_eq!(data.refresh_token.as_deref(), Some("r"));
    assert_eq!(data.user_id, 12);
    assert_eq!(captured(&bodies), vec![json!({ "username": "alice", "password": "pw" })]);
}

#[tokio::test]
async fn user_info_sends_user_id_param() {
    let router = Router::new().route(
        "/api/v1/user/info",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            let id: i64 = params.get("user_id").and_then(|v| v.parse().ok()).unwrap_or_default();
            ok(json!({ "id": id, "username": "alice", "avatar": "http://cdn/a.png" }))
        }),
    );
    let (client, _) = client_for(&serve(router).await);

    let profile = user::get_user_info(&client.http, 12).await.expect("info");
    assert_eq!(profile.id, 12);
    assert_eq!(profile.avatar_url.as_deref(), Some("http://cdn/a.png"));
}

#[tokio::test]
async fn avatar_upload_sends_expected_multipart_fields() {
    let fields = Arc::new(Mutex::new(Vec::<(String, String)>::new()));
    let sink = fields.clone();
    let router = Router::new().route(
        "/api/v1/user/avatar",
        post(move |mut multipart: Multipart| {
            let sink = sink.clone();
            async move {
                while let Ok(Some(field)) = multipart.next_field().await {
                    let name = field.name().unwrap_or_default().to_owned();
                    let text = field.text().await.unwrap_or_default();
                    sink.lock().expect("fields lock").push((name, text));
                }
                ok(json!({ "avatar_url": "http://cdn/new.png" }))
            }
        }),
    );
    let (client, _) = client_for(&serve(router).await);
    client.session.set_credentials("tok", None, 1).expect("credentials");

    let file = UploadFile::new("me.png", "image/png", b"img".to_vec());
    let data = user::upload_avatar(&client.http, &file).await.expect("upload");

    assert_eq!(data.avatar_url.as_deref(), Some("http://cdn/new.png"));
    let fields = fields.lock().expect("fields lock").clone();
    assert_eq!(
        fields,
        vec![
            ("avatar_data".to_owned(), "img".to_owned()),
            ("content_type".to_owned(), "image/png".to_owned()),
        ]
    );
}

// =============================================================================
// Video endpoints
// =============================================================================

#[tokio::test]
async fn video_list_sends_default_paging() {
    let router = Router::new().route(
        "/api/v1/video/list",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            ok(json!({ "videos": [{ "id": 1, "title": "a" }], "total": 31, "echo": params }))
        }),
    );
    let (client, _) = client_for(&serve(router).await);

    let query = VideoListQuery { user_id: Some(3), ..VideoListQuery::default() };
    let page = video::list(&client.http, &query).await.expect("list");
    assert_eq!(page.total, 31);
    assert_eq!(page.videos.len(), 1);
    assert_eq!(page.videos[0].title, "a");
}

#[tokio::test]
async fn hot_omits_absent_cursor_fields() {
    let seen = Arc::new(Mutex::new(HashMap::new()));
    let sink = seen.clone();
    let router = Router::new().route(
        "/api/v1/video/hot",
        get(move |Query(params): Query<HashMap<String, String>>| {
            let sink = sink.clone();
            async move {
                *sink.lock().expect("params lock") = params;
                ok(json!([]))
            }
        }),
    );
    let (client, _) = client_for(&serve(router).await);

    let videos = video::hot(&client.http, &HotQuery::default()).await.expect("hot");
    assert!(videos.is_empty());
    let params = seen.lock().expect("params lock").clone();
    assert_eq!(params.get("limit").map(String::as_str), Some("10"));
    assert!(!params.contains_key("last_id"));
}

#[tokio::test]
async fn search_and_semantic_post_defaults() {
    let bodies = Captured::default();
    let search_sink = bodies.clone();
    let semantic_sink = bodies.clone();
    let router = Router::new()
        .route(
            "/api/v1/video/search",
            post(move |Json(body): Json<Value>| {
                let sink = search_sink.clone();
                async move {
                    sink.lock().expect("capture lock").push(body);
                    ok(json!({ "videos": [], "total": 0 }))
                }
            }),
        )
        .route(
            "/api/v1/video/semantic",
            post(move |Json(body): Json<Value>| {
                let sink = semantic_sink.clone();
                async move {
                    sink.lock().expect("capture lock").push(body);
                    ok(json!({ "results": [{ "id": 2 }], "summary": "s" }))
                }
            }),
        );
    let (client, _) = client_for(&serve(router).await);

    video::search(&client.http, &SearchQuery::new("dog")).await.expect("search");
    let result = video::semantic_search(&client.http, &SemanticQuery::new("dogs playing"))
        .await
        .expect("semantic");

    assert_eq!(result.videos.len(), 1);
    assert_eq!(result.summary, "s");
    let bodies = captured(&bodies);
    assert_eq!(bodies[0], json!({ "keywords": "dog", "page_size": 10, "page_num": 1 }));
    assert_eq!(bodies[1]["threshold"], json!(0.3));
}

#[tokio::test]
async fn publish_includes_session_user_and_requires_login() {
    let fields = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = fields.clone();
    let router = Router::new().route(
        "/api/v1/video/publish",
        post(move |mut multipart: Multipart| {
            let sink = sink.clone();
            async move {
                while let Ok(Some(field)) = multipart.next_field().await {
                    let name = field.name().unwrap_or_default().to_owned();
                    let text = field.text().await.unwrap_or_default();
                    sink.lock().expect("fields lock").push(format!("{name}={text}"));
                }
                ok(json!({ "id": 99 }))
            }
        }),
    );
    let (client, _) = client_for(&serve(router).await);
    let upload = VideoUpload {
        file: UploadFile::new("clip.mp4", "video/mp4", b"vid".to_vec()),
        title: "t".to_owned(),
        description: String::new(),
        category: "pets".to_owned(),
        tags: vec!["a".to_owned(), "b".to_owned()],
        is_private: false,
    };

    let err = video::publish(&client.http, &upload).await.expect_err("logged out");
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    client.session.set_credentials("tok", None, 5).expect("credentials");
    video::publish(&client.http, &upload).await.expect("publish");
    let fields = fields.lock().expect("fields lock").clone();
    assert!(fields.contains(&"user_id=5".to_owned()));
    assert!(fields.contains(&"video_data=vid".to_owned()));
    assert!(fields.contains(&"tags=a,b".to_owned()));
    assert!(fields.contains(&"is_private=false".to_owned()));
}

// =============================================================================
// Social endpoints
// =============================================================================

#[tokio::test]
async fn social_calls_require_session_locally() {
    let hits = Hits::default();
    let counter = hits.clone();
    let router = Router::new().route(
        "/api/v1/social/friends",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.hit();
                ok(json!([]))
            }
        }),
    );
    let (client, _) = client_for(&serve(router).await);

    let err = social::friends::list(&client.http).await.expect_err("unauthorized");
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(hits.count(), 0);
}

#[tokio::test]
async fn friends_list_unwraps_wrapped_payload() {
    let router = Router::new().route(
        "/api/v1/social/friends",
        get(|headers: HeaderMap| async move {
            assert!(headers.contains_key("authorization"));
            ok(json!({ "friends": [{ "friend_id": 4, "username": "bob", "online": true }] }))
        }),
    );
    let (client, _) = client_for(&serve(router).await);
    client.session.set_credentials("tok", None, 1).expect("credentials");

    let friends = social::friends::list(&client.http).await.expect("friends");
    assert_eq!(friends.len(), 1);
    assert_eq!(friends[0].display_name(), "bob");
    assert!(friends[0].online);
}

#[tokio::test]
async fn unread_count_accepts_bare_number_or_object() {
    let router = Router::new()
        .route("/api/v1/social/message/unread/count", get(|| async { ok(json!(3)) }));
    let (client, _) = client_for(&serve(router).await);
    client.session.set_credentials("tok", None, 1).expect("credentials");
    assert_eq!(social::messages::unread_count(&client.http).await.expect("count"), 3);

    let router = Router::new().route(
        "/api/v1/social/message/unread/count",
        get(|| async { ok(json!({ "unread_count": 8 })) }),
    );
    let (client, _) = client_for(&serve(router).await);
    client.session.set_credentials("tok", None, 1).expect("credentials");
    assert_eq!(social::messages::unread_count(&client.http).await.expect("count"), 8);
}

#[tokio::test]
async fn friend_mutations_use_expected_methods_and_bodies() {
    let bodies = Captured::default();
    let handle_sink = bodies.clone();
    let deleted = Hits::default();
    let delete_counter = deleted.clone();
    let router = Router::new()
        .route(
            "/api/v1/social/friend/request/handle",
            post(move |Json(body): Json<Value>| {
                let sink = handle_sink.clone();
                async move {
                    sink.lock().expect("capture lock").push(body);
                    ok(Value::Null)
                }
            }),
        )
        .route(
            "/api/v1/social/friend/{id}",
            delete(move || {
                let counter = delete_counter.clone();
                async move {
                    counter.hit();
                    ok(Value::Null)
                }
            }),
        );
    let (client, _) = client_for(&serve(router).await);
    client.session.set_credentials("tok", None, 1).expect("credentials");

    social::friends::handle_request(&client.http, 11, RequestDecision::Accept)
        .await
        .expect("handle");
    social::friends::delete(&client.http, 4).await.expect("delete");

    assert_eq!(captured(&bodies), vec![json!({ "request_id": 11, "status": 1 })]);
    assert_eq!(deleted.count(), 1);
}

#[tokio::test]
async fn room_history_targets_room_path_with_paging() {
    let router = Router::new().route(
        "/api/v1/social/chatroom/{id}/messages",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            let page = params.get("page").cloned().unwrap_or_default();
            ok(json!({ "messages": [{ "id": 1, "room_id": 5, "content": page, "type": 0 }] }))
        }),
    );
    let (client, _) = client_for(&serve(router).await);
    client.session.set_credentials("tok", None, 1).expect("credentials");

    let page = social::Page { page: 2, size: 50 };
    let messages = social::rooms::history(&client.http, 5, page).await.expect("history");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].room_id, 5);
    assert_eq!(messages[0].content, "2");
}
