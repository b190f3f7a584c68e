//! `/api/v1/video/*` endpoints.

use reqwest::multipart::Form;
use serde_json::{Value, json};

use super::list_field;
use super::types::{HotQuery, SearchQuery, SemanticQuery, SemanticResult, Video, VideoListQuery, VideoPage, VideoUpload};
use crate::error::ApiError;
use crate::http::{HttpClient, RequestOptions};

pub const LIST_PATH: &str = "/api/v1/video/list";
pub const PUBLISH_PATH: &str = "/api/v1/video/publish";
pub const HOT_PATH: &str = "/api/v1/video/hot";
pub const SEARCH_PATH: &str = "/api/v1/video/search";
pub const SEMANTIC_PATH: &str = "/api/v1/video/semantic";

fn video_path(video_id: i64, action: Option<&str>) -> String {
    match action {
        Some(action) => format!("/api/v1/video/{video_id}/{action}"),
        None => format!("/api/v1/video/{video_id}"),
    }
}

fn into_page(data: Value) -> Result<VideoPage, ApiError> {
    let total = data.get("total").and_then(Value::as_i64);
    let videos: Vec<Video> = list_field(data, "videos")?;
    let total = total.unwrap_or_else(|| i64::try_from(videos.len()).unwrap_or(i64::MAX));
    Ok(VideoPage { videos, total })
}

/// # Errors
///
/// Returns the envelope or transport error from [`HttpClient::call`].
pub async fn list(http: &HttpClient, query: &VideoListQuery) -> Result<VideoPage, ApiError> {
    let options = RequestOptions::new()
        .param_opt("user_id", query.user_id)
        .param("page", query.page)
        .param("size", query.size)
        .param("category", &query.category);
    into_page(http.get(LIST_PATH, options).await?)
}

/// # Errors
///
/// Returns the envelope or transport error from [`HttpClient::call`].
pub async fn detail(http: &HttpClient, video_id: i64) -> Result<Video, ApiError> {
    let data: Value = http.get(&video_path(video_id, None), RequestOptions::new()).await?;
    let video = match data {
        Value::Object(mut map) if map.contains_key("video") => map.remove("video").unwrap_or(Value::Null),
        other => other,
    };
    Ok(serde_json::from_value(video)?)
}

/// Publish a video as multipart form data. The author is the session user.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] without a session, otherwise the
/// envelope or transport error from [`HttpClient::call`].
pub async fn publish(http: &HttpClient, upload: &VideoUpload) -> Result<Value, ApiError> {
    let mut form = Form::new();
    if let Some(user_id) = http.session().user_id() {
        form = form.text("user_id", user_id.to_string());
    }
    let form = form
        .part("video_data", upload.file.part()?)
        .text("content_type", upload.file.content_type.clone())
        .text("title", upload.title.clone())
        .text("description", upload.description.clone())
        .text("category", upload.category.clone())
        .text("tags", upload.tags.join(","))
        .text("is_private", upload.is_private.to_string());

    tracing::info!(title = %upload.title, size = upload.file.size(), "publishing video");
    let data: Option<Value> = http
        .post(PUBLISH_PATH, RequestOptions::new().multipart(form).authenticated())
        .await?;
    Ok(data.unwrap_or(Value::Null))
}

/// # Errors
///
/// Returns the envelope or transport error from [`HttpClient::call`].
pub async fn hot(http: &HttpClient, query: &HotQuery) -> Result<Vec<Video>, ApiError> {
    let options = RequestOptions::new()
        .param("limit", query.limit)
        .param_opt("category", query.category.as_deref())
        .param_opt("last_visit", query.last_visit)
        .param_opt("last_like", query.last_like)
        .param_opt("last_id", query.last_id);
    list_field(http.get(HOT_PATH, options).await?, "videos")
}

/// # Errors
///
/// Returns the envelope or transport error from [`HttpClient::call`].
pub async fn increment_visit(http: &HttpClient, video_id: i64) -> Result<(), ApiError> {
    let _: Value = http
        .post(
            &video_path(video_id, Some("visit")),
            RequestOptions::new().json(json!({ "video_id": video_id })),
        )
        .await?;
    Ok(())
}

/// # Errors
///
/// Returns [`ApiError::Unauthorized`] without a session, otherwise the
/// envelope or transport error from [`HttpClient::call`].
pub async fn like(http: &HttpClient, video_id: i64) -> Result<(), ApiError> {
    let _: Value = http
        .post(
            &video_path(video_id, Some("like")),
            RequestOptions::new().json(json!({ "video_id": video_id })).authenticated(),
        )
        .await?;
    Ok(())
}

/// # Errors
///
/// Returns the envelope or transport error from [`HttpClient::call`].
pub async fn search(http: &HttpClient, query: &SearchQuery) -> Result<VideoPage, ApiError> {
    let body = serde_json::to_value(query)?;
    into_page(http.post(SEARCH_PATH, RequestOptions::new().json(body)).await?)
}

/// # Errors
///
/// Returns the envelope or transport error from [`HttpClient::call`].
pub async fn semantic_search(http: &HttpClient, query: &SemanticQuery) -> Result<SemanticResult, ApiError> {
    let body = serde_json::to_value(query)?;
    let data: Value = http.post(SEMANTIC_PATH, RequestOptions::new().json(body)).await?;
    if data.is_array() {
        return Ok(SemanticResult {
            videos: serde_json::from_value(data)?,
            ..SemanticResult::default()
        });
    }
    if data.is_null() {
        return Ok(SemanticResult::default());
    }
    Ok(serde_json::from_value(data)?)
}
