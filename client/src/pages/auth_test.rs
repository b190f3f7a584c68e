use axum::Router;
use axum::routing::{get, post};
use serde_json::json;

use super::*;
use crate::notify::Level;
use crate::router::RouteName;
use crate::test_support::{Hits, client_for, fail, ok, serve};
use crate::Client;

fn page(client: &Client) -> AuthPage {
    AuthPage::new(client.http.clone(), client.notices.clone())
}

fn login_form() -> LoginForm {
    LoginForm { username: "alice".to_owned(), password: "pw".to_owned() }
}

fn backend(login_hits: Hits) -> Router {
    Router::new()
        .route(
            "/api/v1/user/login",
            post(move || {
                let hits = login_hits.clone();
                async move {
                    hits.hit();
                    ok(json!({ "token": "tok", "refresh_token": "ref", "user_id": 3 }))
                }
            }),
        )
        .route("/api/v1/user/info", get(|| async { ok(json!({ "id": 3, "username": "alice" })) }))
}

#[test]
fn register_mismatch_is_validation_error() {
    let form = RegisterForm {
        username: "alice".to_owned(),
        password: "a".to_owned(),
        confirm: "b".to_owned(),
    };
    let err = validate_register(&form).expect_err("mismatch");
    assert_eq!(err.kind(), crate::ErrorKind::Validation);
    assert_eq!(err.user_message(), PASSWORD_MISMATCH);
}

#[test]
fn blank_fields_are_rejected() {
    let err = validate_login(&LoginForm { username: "  ".to_owned(), password: "x".to_owned() })
        .expect_err("blank");
    assert_eq!(err.user_message(), MISSING_FIELDS);
}

#[tokio::test]
async fn register_mismatch_never_reaches_network() {
    let hits = Hits::default();
    let counter = hits.clone();
    let router = Router::new().route(
        "/api/v1/user/register",
        post(move || {
            let counter = counter.clone();
            async move {
                counter.hit();
                ok(json!({}))
            }
        }),
    );
    let (client, _) = client_for(&serve(router).await);

    let form = RegisterForm {
        username: "alice".to_owned(),
        password: "a".to_owned(),
        confirm: "b".to_owned(),
    };
    let notice = page(&client).handle_register(&form).await;

    assert_eq!(notice, Notification::error(PASSWORD_MISMATCH));
    assert_eq!(client.notices.current(), Some(notice));
    assert_eq!(hits.count(), 0);
}

#[tokio::test]
async fn login_success_goes_home_with_notice() {
    let (client, _) = client_for(&serve(backend(Hits::default())).await);

    let notice = page(&client).handle_login(&login_form()).await;

    assert_eq!(notice, Notification::success(LOGIN_SUCCESS));
    assert_eq!(client.navigator.current(), HOME_PATH);
    assert_eq!(client.session.profile().map(|p| p.id), Some(3));
}

#[tokio::test]
async fn login_returns_to_redirect_target() {
    let (client, _) = client_for(&serve(backend(Hits::default())).await);
    let landed = client.navigator.navigate("/social/chat/8");
    assert_eq!(landed.name, RouteName::Login);

    page(&client).handle_login(&login_form()).await;

    assert_eq!(client.navigator.current(), "/social/chat/8");
    assert_eq!(client.navigator.current_route().name, RouteName::PrivateChat);
}

#[tokio::test]
async fn login_failure_shows_server_message() {
    let router = Router::new().route("/api/v1/user/login", post(|| async { fail(10003, "用户名或密码错误") }));
    let (client, _) = client_for(&serve(router).await);

    let notice = page(&client).handle_login(&login_form()).await;

    assert_eq!(notice.level, Level::Error);
    assert_eq!(notice.message, "用户名或密码错误");
    assert!(!client.session.is_logged_in());
    assert_eq!(client.navigator.current(), HOME_PATH);
}

#[tokio::test]
async fn register_with_token_logs_in() {
    let router = Router::new()
        .route(
            "/api/v1/user/register",
            post(|| async { ok(json!({ "token": "new", "user_id": 5 })) }),
        )
        .route("/api/v1/user/info", get(|| async { ok(json!({ "id": 5, "username": "neo" })) }));
    let (client, _) = client_for(&serve(router).await);

    let form = RegisterForm {
        username: "neo".to_owned(),
        password: "pw".to_owned(),
        confirm: "pw".to_owned(),
    };
    let notice = page(&client).handle_register(&form).await;

    assert_eq!(notice, Notification::success(REGISTER_SUCCESS));
    assert_eq!(client.session.user_id(), Some(5));
    assert_eq!(client.navigator.current(), HOME_PATH);
}

#[tokio::test]
async fn register_without_token_goes_to_login() {
    let router = Router::new().route("/api/v1/user/register", post(|| async { ok(json!({ "user_id": 5 })) }));
    let (client, _) = client_for(&serve(router).await);

    let form = RegisterForm {
        username: "neo".to_owned(),
        password: "pw".to_owned(),
        confirm: "pw".to_owned(),
    };
    page(&client).handle_register(&form).await;

    assert!(!client.session.is_logged_in());
    assert_eq!(client.navigator.current_route().name, RouteName::Login);
}

#[tokio::test]
async fn logout_clears_session_and_lands_on_login() {
    let (client, storage) = client_for(&serve(backend(Hits::default())).await);
    let auth = page(&client);
    auth.handle_login(&login_form()).await;

    let notice = auth.handle_logout();

    assert_eq!(notice, Notification::info(LOGOUT_NOTICE));
    assert!(!client.session.is_logged_in());
    assert!(storage.is_empty());
    assert_eq!(client.navigator.current(), LOGIN_PATH);
}
