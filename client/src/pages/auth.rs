//! Login, registration and logout.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use crate::api;
use crate::error::ApiError;
use crate::http::HttpClient;
use crate::notify::{Notification, NotificationCenter};
use crate::router::{HOME_PATH, LOGIN_PATH};
use crate::session::{Credentials, SessionError};

pub const LOGIN_SUCCESS: &str = "登录成功";
pub const REGISTER_SUCCESS: &str = "注册成功";
pub const LOGOUT_NOTICE: &str = "已退出登录";
pub const PASSWORD_MISMATCH: &str = "两次输入的密码不一致";
pub const MISSING_FIELDS: &str = "请输入用户名和密码";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub confirm: String,
}

/// # Errors
///
/// Returns [`ApiError::Validation`] when either field is blank.
pub fn validate_login(form: &LoginForm) -> Result<Credentials, ApiError> {
    credentials(&form.username, &form.password)
}

/// Password confirmation is checked before anything else is sent.
///
/// # Errors
///
/// Returns [`ApiError::Validation`] on a blank field or a confirmation
/// mismatch.
pub fn validate_register(form: &RegisterForm) -> Result<Credentials, ApiError> {
    if form.password != form.confirm {
        return Err(ApiError::Validation(PASSWORD_MISMATCH.to_owned()));
    }
    credentials(&form.username, &form.password)
}

fn credentials(username: &str, password: &str) -> Result<Credentials, ApiError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::Validation(MISSING_FIELDS.to_owned()));
    }
    Ok(Credentials {
        username: username.to_owned(),
        password: password.to_owned(),
    })
}

fn session_notice(error: &SessionError) -> Notification {
    match error {
        SessionError::Api(error) => Notification::from_error(error),
        other => Notification::error(other.to_string()),
    }
}

/// Auth screen handlers.
#[derive(Clone, Debug)]
pub struct AuthPage {
    http: HttpClient,
    notices: NotificationCenter,
}

impl AuthPage {
    #[must_use]
    pub fn new(http: HttpClient, notices: NotificationCenter) -> Self {
        Self { http, notices }
    }

    /// Log in and go to the `redirect` return path, or home.
    pub async fn handle_login(&self, form: &LoginForm) -> Notification {
        let notice = match self.login(form).await {
            Ok(()) => {
                let target = self
                    .http
                    .navigator()
                    .return_path()
                    .unwrap_or_else(|| HOME_PATH.to_owned());
                self.http.navigator().navigate(&target);
                Notification::success(LOGIN_SUCCESS)
            }
            Err(notice) => notice,
        };
        self.publish(notice)
    }

    async fn login(&self, form: &LoginForm) -> Result<(), Notification> {
        let credentials = validate_login(form).map_err(|e| Notification::from_error(&e))?;
        self.http
            .session()
            .login(&self.http, &credentials)
            .await
            .map(|_| ())
            .map_err(|e| session_notice(&e))
    }

    /// Register. When the server returns a token the user is logged in and
    /// sent home; otherwise they are sent to the login screen.
    pub async fn handle_register(&self, form: &RegisterForm) -> Notification {
        let notice = match self.register(form).await {
            Ok(()) => Notification::success(REGISTER_SUCCESS),
            Err(notice) => notice,
        };
        self.publish(notice)
    }

    async fn register(&self, form: &RegisterForm) -> Result<(), Notification> {
        let credentials = validate_register(form).map_err(|e| Notification::from_error(&e))?;
        let data = api::user::register(&self.http, &credentials)
            .await
            .map_err(|e| Notification::from_error(&e))?;

        let session = self.http.session();
        match (data.token.as_deref().filter(|t| !t.is_empty()), data.user_id) {
            (Some(token), Some(user_id)) => {
                session
                    .set_credentials(token, data.refresh_token.as_deref(), user_id)
                    .map_err(|e| session_notice(&e))?;
                match api::user::get_user_info(&self.http, user_id).await {
                    Ok(profile) if profile.is_valid() => {
                        if let Err(error) = session.set_profile(profile) {
                            tracing::warn!(%error, "could not cache profile after registration");
                        }
                    }
                    Ok(_) => {}
                    Err(error) => tracing::warn!(%error, "profile fetch after registration failed"),
                }
                self.http.navigator().navigate(HOME_PATH);
            }
            _ => {
                self.http.navigator().navigate(LOGIN_PATH);
            }
        }
        Ok(())
    }

    /// Clear the session and return to the login screen.
    pub fn handle_logout(&self) -> Notification {
        if let Err(error) = self.http.session().logout() {
            tracing::warn!(%error, "session storage not fully cleared");
        }
        self.http.navigator().navigate(LOGIN_PATH);
        self.publish(Notification::info(LOGOUT_NOTICE))
    }

    fn publish(&self, notice: Notification) -> Notification {
        self.notices.show(notice.clone());
        notice
    }
}
