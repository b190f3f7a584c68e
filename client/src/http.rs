//! Envelope-aware HTTP wrapper.
//!
//! ARCHITECTURE
//! ============
//! Outbound: attach `Authorization: Bearer <token>` when the session holds a
//! token; refuse protected calls locally when it does not.
//! Inbound: unwrap `{ base: { code, msg }, data }`, resolving with `data` on
//! `code == 0` and failing with `msg` otherwise.
//!
//! ERROR HANDLING
//! ==============
//! A 401 is a session-invalidation event: the session is cleared (memory and
//! storage) and the navigator is sent to login with the current location as
//! the return path. That is the only side effect this module has.

#[cfg(test)]
#[path = "http_test.rs"]
mod http_test;

use frames::{BaseStatus, Envelope};
use reqwest::multipart::Form;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::router::Navigator;
use crate::session::SessionStore;

const FALLBACK_ERROR_MESSAGE: &str = "请求失败";

/// Whether a call may be issued without a session token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthRequirement {
    /// Token attached when present.
    #[default]
    Optional,
    /// Fails locally with [`ApiError::Unauthorized`] when no token is held.
    Required,
}

#[derive(Debug)]
pub enum RequestBody {
    Json(Value),
    Multipart(Form),
}

/// Per-call options for [`HttpClient::call`].
#[derive(Debug, Default)]
pub struct RequestOptions {
    pub params: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub headers: Vec<(String, String)>,
    pub auth: AuthRequirement,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_owned(), value.to_string()));
        self
    }

    /// Add a query parameter only when `value` is present.
    #[must_use]
    pub fn param_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    #[must_use]
    pub fn multipart(mut self, form: Form) -> Self {
        self.body = Some(RequestBody::Multipart(form));
        self
    }

    #[must_use]
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_owned(), value.to_owned()));
        self
    }

    #[must_use]
    pub fn authenticated(mut self) -> Self {
        self.auth = AuthRequirement::Required;
        self
    }
}

/// HTTP client bound to one gateway, one session and one navigator.
#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: reqwest::Client,
    base_url: String,
    session: SessionStore,
    navigator: Navigator,
    cancel: Option<CancellationToken>,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if the underlying client cannot be built.
    pub fn new(config: &ClientConfig, session: SessionStore, navigator: Navigator) -> Result<Self, ApiError> {
        let inner = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            inner,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            session,
            navigator,
            cancel: None,
        })
    }

    /// A handle whose every call is bounded by `cancel`. Used to tie a whole
    /// command or view to one cancellation scope.
    #[must_use]
    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            cancel: Some(cancel),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    #[must_use]
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET` shorthand for [`HttpClient::call`].
    ///
    /// # Errors
    ///
    /// See [`HttpClient::call`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T, ApiError> {
        self.call(Method::GET, path, options).await
    }

    /// `POST` shorthand for [`HttpClient::call`].
    ///
    /// # Errors
    ///
    /// See [`HttpClient::call`].
    pub async fn post<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T, ApiError> {
        self.call(Method::POST, path, options).await
    }

    /// `PUT` shorthand for [`HttpClient::call`].
    ///
    /// # Errors
    ///
    /// See [`HttpClient::call`].
    pub async fn put<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T, ApiError> {
        self.call(Method::PUT, path, options).await
    }

    /// `DELETE` shorthand for [`HttpClient::call`].
    ///
    /// # Errors
    ///
    /// See [`HttpClient::call`].
    pub async fn delete<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T, ApiError> {
        self.call(Method::DELETE, path, options).await
    }

    /// Issue one request and unwrap its envelope. A handle made with
    /// [`HttpClient::with_cancel`] races the call against its token.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Cancelled`] when the bound token fires first.
    /// - [`ApiError::Unauthorized`] on HTTP 401 or a protected call without a token.
    /// - [`ApiError::Application`] when `base.code != 0`.
    /// - [`ApiError::Network`] on transport failure or another non-2xx status.
    /// - [`ApiError::Decode`] when `data` does not match `T`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        match &self.cancel {
            Some(cancel) => self.call_with_cancel(method, path, options, cancel).await,
            None => self.send_request(method, path, options).await,
        }
    }

    async fn send_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let token = self.session.token();
        if options.auth == AuthRequirement::Required && token.is_none() {
            tracing::debug!(%method, path, "protected call without a session token");
            self.invalidate_session();
            return Err(ApiError::Unauthorized);
        }

        let url = self.url(path);
        let mut request = self.inner.request(method.clone(), &url);
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }
        if !options.params.is_empty() {
            request = request.query(&options.params);
        }
        for (key, value) in &options.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        request = match options.body {
            Some(RequestBody::Json(body)) => request.json(&body),
            Some(RequestBody::Multipart(form)) => request.multipart(form),
            None => request,
        };

        tracing::debug!(%method, %url, "sending request");
        let response = request.send().await.map_err(|error| {
            tracing::warn!(%method, %url, %error, "request failed");
            ApiError::from(error)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::info!(%url, "server rejected session");
            self.invalidate_session();
            return Err(ApiError::Unauthorized);
        }

        let bytes = response.bytes().await?;
        let envelope = serde_json::from_slice::<Envelope<Value>>(&bytes);
        tracing::debug!(%url, status = status.as_u16(), "received response");

        if !status.is_success() {
            let base = envelope.ok().and_then(|env| env.into_result().err());
            return Err(match base {
                Some(base) => application_error(base),
                None => ApiError::Network(format!("HTTP {}", status.as_u16())),
            });
        }

        match envelope?.into_result() {
            Ok(data) => Ok(serde_json::from_value(data.unwrap_or(Value::Null))?),
            Err(base) => {
                tracing::debug!(%url, code = base.code, msg = %base.msg, "application error");
                Err(application_error(base))
            }
        }
    }

    /// [`HttpClient::call`] raced against `cancel`. A cancelled call leaves
    /// the session untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Cancelled`] if `cancel` fires first, otherwise the
    /// call's own result.
    pub async fn call_with_cancel<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!(path, "request cancelled");
                Err(ApiError::Cancelled)
            }
            result = self.send_request(method, path, options) => result,
        }
    }

    fn invalidate_session(&self) {
        if let Err(error) = self.session.logout() {
            tracing::warn!(%error, "failed to clear persisted session");
        }
        self.navigator.redirect_to_login();
    }
}

fn application_error(base: BaseStatus) -> ApiError {
    let message = if base.msg.trim().is_empty() {
        FALLBACK_ERROR_MESSAGE.to_owned()
    } else {
        base.msg
    };
    ApiError::Application {
        code: base.code,
        message,
    }
}
