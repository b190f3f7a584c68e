use super::*;

#[test]
fn new_notification_replaces_previous() {
    let center = NotificationCenter::default();
    let now = Instant::now();
    center.show_at(Notification::info("first"), now);
    center.show_at(Notification::success("second"), now);
    assert_eq!(center.current_at(now), Some(Notification::success("second")));
}

#[test]
fn notification_expires_after_toast_duration() {
    let center = NotificationCenter::default();
    let now = Instant::now();
    center.show_at(Notification::error("oops"), now);

    assert!(center.current_at(now + Duration::from_millis(2_999)).is_some());
    assert_eq!(center.current_at(now + TOAST_DURATION), None);
}

#[test]
fn replacement_restarts_the_timer() {
    let center = NotificationCenter::default();
    let start = Instant::now();
    center.show_at(Notification::info("a"), start);
    center.show_at(Notification::info("b"), start + Duration::from_secs(2));
    assert_eq!(
        center.current_at(start + Duration::from_secs(4)),
        Some(Notification::info("b"))
    );
}

#[test]
fn dismiss_clears_slot() {
    let center = NotificationCenter::default();
    center.show(Notification::info("bye"));
    center.dismiss();
    assert_eq!(center.current(), None);
}

#[test]
fn clones_share_one_slot() {
    let center = NotificationCenter::default();
    let other = center.clone();
    other.show(Notification::success("shared"));
    assert_eq!(center.current().map(|n| n.message), Some("shared".to_owned()));
}

#[test]
fn api_errors_map_to_user_text() {
    let cases = [
        (ApiError::Application { code: 3, message: "用户名已存在".to_owned() }, "用户名已存在"),
        (ApiError::Unauthorized, "登录已过期，请重新登录"),
        (ApiError::Network("refused".to_owned()), "网络错误，请稍后重试"),
        (ApiError::Validation("两次输入的密码不一致".to_owned()), "两次输入的密码不一致"),
    ];
    for (error, expected) in cases {
        let notice = Notification::from_error(&error);
        assert_eq!(notice.level, Level::Error);
        assert_eq!(notice.message, expected);
    }
}

#[test]
fn display_includes_level() {
    assert_eq!(Notification::success("登录成功").to_string(), "[success] 登录成功");
}
