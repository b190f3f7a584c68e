//! Home screen: profile card, video grid, friend list and upload.

#[cfg(test)]
#[path = "home_test.rs"]
mod home_test;

use std::fmt::Write as _;

use time::OffsetDateTime;

use crate::api;
use crate::api::types::{Friendship, Profile, Video, VideoListQuery, VideoPage, VideoUpload};
use crate::error::{ApiError, ErrorKind};
use crate::format::{format_duration, format_time_str, format_views};
use crate::http::HttpClient;
use crate::notify::{Notification, NotificationCenter};
use crate::session::DEFAULT_AVATAR;

pub const UPLOAD_SUCCESS: &str = "视频上传成功";
pub const UPLOAD_FAILED: &str = "上传失败，请重试";

#[derive(Clone, Debug)]
pub struct HomeView {
    http: HttpClient,
    notices: NotificationCenter,
}

impl HomeView {
    #[must_use]
    pub fn new(http: HttpClient, notices: NotificationCenter) -> Self {
        Self { http, notices }
    }

    /// Refresh the cached profile from the server. Falls back to the cached
    /// copy when the session has no user id.
    ///
    /// # Errors
    ///
    /// Returns the API error from the profile request.
    pub async fn load_profile(&self) -> Result<Option<Profile>, ApiError> {
        let session = self.http.session();
        let Some(user_id) = session.user_id() else {
            return Ok(session.profile());
        };
        let profile = api::user::get_user_info(&self.http, user_id).await.inspect_err(|error| {
            tracing::warn!(%error, "failed to load profile");
        })?;
        if !profile.is_valid() {
            return Ok(session.profile());
        }
        if let Err(error) = session.set_profile(profile.clone()) {
            tracing::warn!(%error, "profile not cached");
        }
        Ok(Some(profile))
    }

    /// # Errors
    ///
    /// Returns the API error from the list request.
    pub async fn load_videos(&self, query: &VideoListQuery) -> Result<VideoPage, ApiError> {
        api::video::list(&self.http, query).await.inspect_err(|error| {
            tracing::warn!(%error, "failed to load videos");
        })
    }

    /// # Errors
    ///
    /// Returns the API error from the friends request.
    pub async fn load_friends(&self) -> Result<Vec<Friendship>, ApiError> {
        api::social::friends::list(&self.http).await.inspect_err(|error| {
            tracing::warn!(%error, "failed to load friends");
        })
    }

    /// Publish a video and report the outcome as a notification.
    pub async fn upload_video(&self, upload: &VideoUpload) -> Notification {
        let notice = match api::video::publish(&self.http, upload).await {
            Ok(_) => Notification::success(UPLOAD_SUCCESS),
            Err(error) if error.kind() == ErrorKind::Network => Notification::error(UPLOAD_FAILED),
            Err(error) => Notification::from_error(&error),
        };
        self.notices.show(notice.clone());
        notice
    }
}

#[must_use]
pub fn render_profile(profile: &Profile) -> String {
    format!(
        "{}\nID: {}\n头像: {}",
        profile.display_name(),
        profile.id,
        profile.display_avatar()
    )
}

/// One video card: title, then author, views and age.
#[must_use]
pub fn render_video_card(video: &Video, now: OffsetDateTime) -> String {
    let author = video
        .author
        .as_ref()
        .map_or_else(|| format!("用户{}", video.user_id), |a| a.display_name().to_owned());
    let mut card = format!("{}\n{} • {}次观看", video.title, author, format_views(video.visit_count));
    if video.duration > 0 {
        let _ = write!(card, " • {}", format_duration(video.duration));
    }
    let age = video
        .created_at
        .as_deref()
        .map(|raw| format_time_str(raw, now))
        .unwrap_or_default();
    if !age.is_empty() {
        let _ = write!(card, " • {age}");
    }
    card
}

#[must_use]
pub fn render_videos(videos: &[Video], now: OffsetDateTime) -> String {
    videos
        .iter()
        .map(|v| render_video_card(v, now))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[must_use]
pub fn render_friends(friends: &[Friendship]) -> String {
    friends
        .iter()
        .map(|f| {
            let status = if f.online { "在线" } else { "离线" };
            let avatar = f.avatar_url.as_deref().filter(|a| !a.is_empty()).unwrap_or(DEFAULT_AVATAR);
            format!("{} [{status}] {avatar}", f.display_name())
        })
        .collect::<Vec<_>>()
        .join("\n")
}
