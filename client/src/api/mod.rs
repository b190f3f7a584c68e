//! Typed endpoint call sites over [`crate::http::HttpClient`].
//!
//! Each submodule mirrors one backend service. Functions take the HTTP client
//! by reference, build the request shape the gateway expects and decode the
//! envelope's `data` into the types in [`types`].

pub mod social;
pub mod types;
pub mod user;
pub mod video;

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::path::Path;

use reqwest::multipart::Part;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Decode a list that the gateway returns either bare or wrapped in an
/// object under `key`. `null` and a missing key are the empty list.
///
/// # Errors
///
/// Returns [`ApiError::Decode`] when the items do not match `T`.
pub fn list_field<T: DeserializeOwned>(data: Value, key: &str) -> Result<Vec<T>, ApiError> {
    let items = match data {
        Value::Null => return Ok(Vec::new()),
        Value::Object(mut map) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    };
    if items.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(items)?)
}

/// In-memory file attached to a multipart upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    #[must_use]
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read `path`, guessing the content type from its extension.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be read.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "upload".to_owned(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(file_name, content_type_for(path), bytes))
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub(crate) fn part(&self) -> Result<Part, ApiError> {
        Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.content_type)
            .map_err(|_| ApiError::Validation(format!("无效的文件类型: {}", self.content_type)))
    }
}

/// MIME type for the upload extensions the gateway accepts.
#[must_use]
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}
