use chrono::Duration;
use tollgate::{Clock, ServiceOptions, service::Permissions};

use crate::context::{DOMAIN, TestContext};

#[tokio::test]
async fn test_login_issues_token_and_window() {
    let ctx = TestContext::new().await;
    assert_eq!(ctx.register("alice", "a@x.com", "pw1").await.head.code, 200);
    let now = ctx.clock.now();

    let response = ctx.login("alice", "pw1").await;
    assert_eq!(response.head.code, 200, "{}", response.head.message);
    assert!(ctx.verify(&response));

    let user = TestContext::user_of(&response);
    let options = ServiceOptions::default();
    assert_eq!(user.token.len(), 64);
    assert!(user.is_logged_in);
    assert_eq!(user.login_at, Some(now));
    assert_eq!(user.timeout_at, Some(now + options.session_timeout));
    assert_eq!(user.max_session_at, Some(now + options.max_session));

    let stored = ctx.store.fetch_user_by_token(&user.token).await.unwrap();
    assert_eq!(stored.login_name(), "alice");
    assert_eq!(stored.fail_count(), 0);
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_the_same() {
    let ctx = TestContext::new().await;
    assert_eq!(ctx.register("alice", "a@x.com", "pw1").await.head.code, 200);

    let wrong = ctx.login("alice", "nope").await;
    let unknown = ctx.login("mallory", "pw1").await;
    assert_eq!(wrong.head.code, 401);
    assert_eq!(unknown.head.code, 401);
    assert_eq!(wrong.head.message, unknown.head.message);
    assert_eq!(wrong.head.message, "invalid user or password");
    assert!(wrong.body.is_empty());
}

#[tokio::test]
async fn test_failed_logins_are_counted_then_reset() {
    let ctx = TestContext::new().await;
    assert_eq!(ctx.register("alice", "a@x.com", "pw1").await.head.code, 200);

    ctx.login("alice", "bad").await;
    ctx.clock.advance_secs(5);
    ctx.login("alice", "bad").await;
    let alice = ctx.store.fetch_user_by_login(DOMAIN, "alice").await.unwrap();
    assert_eq!(alice.fail_count(), 2);
    assert_eq!(alice.last_failed_at(), Some(ctx.clock.now()));

    assert_eq!(ctx.login("alice", "pw1").await.head.code, 200);
    let alice = ctx.store.fetch_user_by_login(DOMAIN, "alice").await.unwrap();
    assert_eq!(alice.fail_count(), 0);
}

#[tokio::test]
async fn test_lockout_threshold() {
    let ctx = TestContext::with_options(ServiceOptions {
        permissions: Permissions::all(),
        lockout_threshold: Some(3),
        ..ServiceOptions::default()
    })
    .await;
    assert_eq!(ctx.register("alice", "a@x.com", "pw1").await.head.code, 200);

    for _ in 0..3 {
        assert_eq!(ctx.login("alice", "bad").await.head.code, 401);
    }
    let response = ctx.login("alice", "pw1").await;
    assert_eq!(response.head.code, 401);
    // A locked account answers exactly like a wrong password.
    let wrong = ctx.login("alice", "bad").await;
    assert_eq!(response.head.message, "invalid user or password");
    assert_eq!(response.head.message, wrong.head.message);
}

#[tokio::test]
async fn test_no_lockout_by_default() {
    let ctx = TestContext::new().await;
    assert_eq!(ctx.register("alice", "a@x.com", "pw1").await.head.code, 200);
    for _ in 0..10 {
        ctx.login("alice", "bad").await;
    }
    assert_eq!(ctx.login("alice", "pw1").await.head.code, 200);
}

#[tokio::test]
async fn test_second_login_conflicts_until_expiry() {
    let ctx = TestContext::new().await;
    let first = ctx.session("alice", "a@x.com", "pw1").await;

    let response = ctx.login("alice", "pw1").await;
    assert_eq!(response.head.code, 409);

    // Past the idle timeout the old session is dead and a new one starts.
    let timeout = ServiceOptions::default().session_timeout;
    ctx.clock.advance_secs(timeout.num_seconds());
    let response = ctx.login("alice", "pw1").await;
    assert_eq!(response.head.code, 200);
    let second = TestContext::user_of(&response).token;
    assert_ne!(first, second);
    assert!(ctx.store.fetch_user_by_token(&first).await.is_err());
}

#[tokio::test]
async fn test_authenticate_slides_timeout() {
    let ctx = TestContext::new().await;
    let token = ctx.session("alice", "a@x.com", "pw1").await;
    let timeout = ServiceOptions::default().session_timeout;

    ctx.clock.advance_secs(600);
    let response = ctx.authenticate(&token).await;
    assert_eq!(response.head.code, 200, "{}", response.head.message);
    let user = TestContext::user_of(&response);
    assert_eq!(user.last_auth_at, Some(ctx.clock.now()));
    assert_eq!(user.timeout_at, Some(ctx.clock.now() + timeout));

    // Still alive past the original timeout thanks to the refresh.
    ctx.clock.advance_secs(timeout.num_seconds() - 1);
    assert_eq!(ctx.authenticate(&token).await.head.code, 200);
}

#[tokio::test]
async fn test_authenticate_expired_session() {
    let ctx = TestContext::new().await;
    let token = ctx.session("alice", "a@x.com", "pw1").await;

    ctx.clock
        .advance_secs(ServiceOptions::default().session_timeout.num_seconds());
    let response = ctx.authenticate(&token).await;
    assert_eq!(response.head.code, 401);
    assert_eq!(response.head.message, "Session has expired");
}

#[tokio::test]
async fn test_max_session_caps_refreshes() {
    let ctx = TestContext::with_options(ServiceOptions {
        session_timeout: Duration::minutes(10),
        max_session: Duration::minutes(25),
        ..ServiceOptions::default()
    })
    .await;
    let token = ctx.session("alice", "a@x.com", "pw1").await;

    for _ in 0..2 {
        ctx.clock.advance_secs(9 * 60);
        assert_eq!(ctx.authenticate(&token).await.head.code, 200);
    }
    ctx.clock.advance_secs(7 * 60);
    assert_eq!(ctx.authenticate(&token).await.head.code, 401);
}

#[tokio::test]
async fn test_logout_clears_session() {
    let ctx = TestContext::new().await;
    let token = ctx.session("alice", "a@x.com", "pw1").await;

    let response = ctx.logout(&token).await;
    assert_eq!(response.head.code, 200);
    let user = TestContext::user_of(&response);
    assert!(!user.is_logged_in);
    assert!(user.token.is_empty());
    assert_eq!(user.logout_at, Some(ctx.clock.now()));

    assert_eq!(ctx.authenticate(&token).await.head.code, 404);
    assert_eq!(ctx.logout(&token).await.head.code, 404);

    // A fresh login works straight away.
    assert_eq!(ctx.login("alice", "pw1").await.head.code, 200);
}

#[tokio::test]
async fn test_blank_token_is_a_bad_request() {
    let ctx = TestContext::new().await;
    assert_eq!(ctx.authenticate("").await.head.code, 400);
    assert_eq!(ctx.logout("").await.head.code, 400);
}

#[tokio::test]
async fn test_deactivated_user_cannot_log_in() {
    let ctx = TestContext::new().await;
    assert_eq!(ctx.register("alice", "a@x.com", "pw1").await.head.code, 200);
    let mut alice = ctx.store.fetch_user_by_login(DOMAIN, "alice").await.unwrap();
    alice.soft_delete(ctx.clock.now());
    ctx.store.user_update(&alice).await.unwrap();

    let response = ctx.login("alice", "pw1").await;
    assert_eq!(response.head.code, 401);
    assert_eq!(response.head.message, "Account is not active");
}

#[tokio::test]
async fn test_full_flow_on_test_backend() {
    let ctx = TestContext::on_test_backend().await;
    let token = ctx.session("alice", "a@x.com", "pw1").await;
    assert_eq!(ctx.authenticate(&token).await.head.code, 200);
    assert_eq!(ctx.logout(&token).await.head.code, 200);
    assert_eq!(ctx.authenticate(&token).await.head.code, 404);
}

#[tokio::test]
async fn test_session_window_past_calendar_fails_cleanly() {
    let ctx = TestContext::with_options(ServiceOptions {
        session_timeout: Duration::seconds(9_000_000_000_000),
        ..ServiceOptions::default()
    })
    .await;
    assert_eq!(ctx.register("alice", "a@x.com", "pw1").await.head.code, 200);
    let before = ctx.releases();

    let response = ctx.login("alice", "pw1").await;
    assert_eq!(response.head.code, 500);
    assert!(response.head.message.starts_with("Session window out of range"));
    assert!(response.body.is_empty());
    assert_eq!(ctx.releases(), before + 1);

    let alice = ctx.store.fetch_user_by_login(DOMAIN, "alice").await.unwrap();
    assert!(!alice.is_logged_in());
    assert!(alice.token().is_empty());
}
