use serde_json::json;
use tollgate::{Operation, ServiceOptions, service::Permissions};

use crate::context::{DOMAIN, TestContext};

#[tokio::test]
async fn test_update_every_field() {
    let ctx = TestContext::new().await;
    let token = ctx.session("alice", "a@x.com", "pw1").await;

    let response = ctx
        .update(json!({
            "Token": token,
            "Login": "alice2",
            "Name": "Alice Two",
            "Email": "a2@x.com",
            "OldPassword": "pw1",
            "NewPassword": "pw2",
        }))
        .await;
    assert_eq!(response.head.code, 200, "{}", response.head.message);
    assert_eq!(
        response.head.message,
        "Fields updated: Login, Name, Email, Password"
    );
    let user = TestContext::user_of(&response);
    assert_eq!(user.login_name, "alice2");
    assert_eq!(user.full_name, "Alice Two");
    assert_eq!(user.email, "a2@x.com");

    ctx.logout(&token).await;
    assert_eq!(ctx.login("alice2", "pw1").await.head.code, 401);
    assert_eq!(ctx.login("alice2", "pw2").await.head.code, 200);
}

#[tokio::test]
async fn test_update_respects_permissions() {
    let mut permissions = Permissions::default();
    permissions.permit_name = true;
    let ctx = TestContext::with_options(ServiceOptions {
        permissions,
        ..ServiceOptions::default()
    })
    .await;
    let token = ctx.session("alice", "a@x.com", "pw1").await;

    let response = ctx
        .update(json!({ "Token": token, "Login": "mallory", "Name": "Alice L." }))
        .await;
    assert_eq!(response.head.code, 200);
    assert_eq!(response.head.message, "Fields updated: Name");
    let user = TestContext::user_of(&response);
    assert_eq!(user.login_name, "alice");
    assert_eq!(user.full_name, "Alice L.");

    let response = ctx
        .update(json!({ "Token": token, "Email": "new@x.com" }))
        .await;
    assert_eq!(response.head.code, 400);
    assert_eq!(response.head.message, "No fields included for update");
}

#[tokio::test]
async fn test_explicit_permissions_override_options() {
    let ctx = TestContext::new().await;
    let token = ctx.session("alice", "a@x.com", "pw1").await;

    let mut email_only = Permissions::default();
    email_only.permit_email = true;
    let request = ctx.request(&json!({ "Token": token, "Name": "X", "Email": "x@x.com" }).to_string());
    let response = ctx
        .service
        .update(&ctx.store, &ctx.caller, request, &email_only)
        .await;
    assert_eq!(response.head.message, "Fields updated: Email");

    let request = ctx.request(&json!({ "Token": token, "Name": "X" }).to_string());
    let response = ctx
        .service
        .update(&ctx.store, &ctx.caller, request, &Permissions::default())
        .await;
    assert_eq!(response.head.code, 500);
    assert_eq!(response.head.message, "No updates in options");
}

#[tokio::test]
async fn test_password_change_needs_old_password() {
    let ctx = TestContext::new().await;
    let token = ctx.session("alice", "a@x.com", "pw1").await;

    let response = ctx
        .update(json!({ "Token": token, "OldPassword": "wrong", "NewPassword": "pw2" }))
        .await;
    assert_eq!(response.head.code, 401);

    let response = ctx
        .update(json!({ "Token": token, "NewPassword": "pw2" }))
        .await;
    assert_eq!(response.head.code, 400);

    let alice = ctx.store.fetch_user_by_login(DOMAIN, "alice").await.unwrap();
    assert_eq!(
        alice.password_hash(),
        format!("pw1;{};SALT;Plaintext", alice.salt())
    );
}

#[tokio::test]
async fn test_update_validates_new_values() {
    let ctx = TestContext::new().await;
    let token = ctx.session("alice", "a@x.com", "pw1").await;

    let response = ctx
        .update(json!({ "Token": token, "Email": "broken" }))
        .await;
    assert_eq!(response.head.code, 400);

    // Taking another user's login is a conflict.
    assert_eq!(ctx.register("bob", "b@x.com", "pw").await.head.code, 200);
    let response = ctx
        .update(json!({ "Token": token, "Login": "bob" }))
        .await;
    assert_eq!(response.head.code, 409);
}

#[tokio::test]
async fn test_update_with_expired_session() {
    let ctx = TestContext::new().await;
    let token = ctx.session("alice", "a@x.com", "pw1").await;
    ctx.clock
        .advance_secs(ServiceOptions::default().session_timeout.num_seconds());

    let response = ctx.update(json!({ "Token": token, "Name": "Late" })).await;
    assert_eq!(response.head.code, 401);
}

#[tokio::test]
async fn test_update_unknown_token() {
    let ctx = TestContext::new().await;
    let response = ctx
        .call(Operation::Update, &json!({ "Token": "ffff", "Name": "X" }).to_string())
        .await;
    assert_eq!(response.head.code, 404);
}
