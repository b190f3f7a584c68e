//! `/api/v1/user/*` endpoints.

use reqwest::multipart::Form;
use serde_json::json;

use super::UploadFile;
use super::types::{AvatarData, LoginData, Profile, RegisterData};
use crate::error::ApiError;
use crate::http::{HttpClient, RequestOptions};
use crate::session::Credentials;

pub const LOGIN_PATH: &str = "/api/v1/user/login";
pub const REGISTER_PATH: &str = "/api/v1/user/register";
pub const INFO_PATH: &str = "/api/v1/user/info";
pub const AVATAR_PATH: &str = "/api/v1/user/avatar";

/// # Errors
///
/// Returns the envelope or transport error from [`HttpClient::call`].
pub async fn login(http: &HttpClient, credentials: &Credentials) -> Result<LoginData, ApiError> {
    http.post(LOGIN_PATH, RequestOptions::new().json(credentials_body(credentials)))
        .await
}

/// # Errors
///
/// Returns the envelope or transport error from [`HttpClient::call`].
pub async fn register(http: &HttpClient, credentials: &Credentials) -> Result<RegisterData, ApiError> {
    let data: Option<RegisterData> = http
        .post(REGISTER_PATH, RequestOptions::new().json(credentials_body(credentials)))
        .await?;
    Ok(data.unwrap_or_default())
}

/// # Errors
///
/// Returns the envelope or transport error from [`HttpClient::call`].
pub async fn get_user_info(http: &HttpClient, user_id: i64) -> Result<Profile, ApiError> {
    let profile: Option<Profile> = http
        .get(INFO_PATH, RequestOptions::new().param("user_id", user_id))
        .await?;
    Ok(profile.unwrap_or_default())
}

/// Upload a new avatar as multipart `avatar_data` + `content_type`.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] without a session, otherwise the
/// envelope or transport error from [`HttpClient::call`].
pub async fn upload_avatar(http: &HttpClient, file: &UploadFile) -> Result<AvatarData, ApiError> {
    let form = Form::new()
        .part("avatar_data", file.part()?)
        .text("content_type", file.content_type.clone());
    let data: Option<AvatarData> = http
        .post(AVATAR_PATH, RequestOptions::new().multipart(form).authenticated())
        .await?;
    Ok(data.unwrap_or_default())
}

fn credentials_body(credentials: &Credentials) -> serde_json::Value {
    json!({ "username": credentials.username, "password": credentials.password })
}
