use std::sync::Arc;

use tollgate::{
    AuthService, Clock, Operation, ServiceOptions,
    crypt::drivers::plaintext::PlaintextDriver,
    envelope::{Head, Package},
};

use crate::context::{DOMAIN, TestContext};
use crate::helpers::new_user;

#[tokio::test]
async fn test_register_returns_projection() {
    let ctx = TestContext::new().await;
    let response = ctx.register("alice", "a@x.com", "pw1").await;

    assert_eq!(response.head.code, 200, "{}", response.head.message);
    assert!(ctx.verify(&response));
    let user = TestContext::user_of(&response);
    assert_eq!(user.domain, DOMAIN);
    assert_eq!(user.login_name, "alice");
    assert_eq!(user.email, "a@x.com");
    assert_eq!(user.full_name, "alice tester");
    assert!(user.is_active);
    assert!(!user.is_logged_in);
    assert!(user.token.is_empty());
    assert!(!response.body.contains("PasswordHash"));
    assert!(!response.body.contains("Salt"));
}

#[tokio::test]
async fn test_register_stores_hashed_password() {
    let ctx = TestContext::new().await;
    let response = ctx.register("alice", "a@x.com", "pw1").await;
    let guid = TestContext::user_of(&response).guid;

    let stored = ctx.store.fetch_user_by_guid(&guid).await.unwrap();
    assert_eq!(stored.domain(), DOMAIN);
    assert!(!stored.is_system());
    // The plaintext driver makes the stored value readable.
    assert_eq!(
        stored.password_hash(),
        format!("pw1;{};SALT;Plaintext", stored.salt())
    );
}

#[tokio::test]
async fn test_register_duplicate_login_conflicts() {
    let ctx = TestContext::new().await;
    assert_eq!(ctx.register("alice", "a@x.com", "pw1").await.head.code, 200);

    let response = ctx.register("alice", "other@x.com", "pw2").await;
    assert_eq!(response.head.code, 409);
    assert!(response.body.is_empty());
    assert!(ctx.verify(&response));

    let response = ctx.register("alicia", "a@x.com", "pw2").await;
    assert_eq!(response.head.code, 409);
}

#[tokio::test]
async fn test_register_validation_failures() {
    let ctx = TestContext::new().await;
    for (login, email, password) in [
        ("", "a@x.com", "pw1"),
        ("al ice", "a@x.com", "pw1"),
        ("alice", "not-an-email", "pw1"),
        ("alice", "a@x.com", ""),
    ] {
        let response = ctx.register(login, email, password).await;
        assert_eq!(response.head.code, 400, "{login:?} {email:?} {password:?}");
    }
    assert_eq!(ctx.conn().user_count().await, 1);
}

#[tokio::test]
async fn test_register_rejects_malformed_body() {
    let ctx = TestContext::new().await;
    let response = ctx.call(Operation::Register, "not json").await;
    assert_eq!(response.head.code, 400);
    assert!(response.head.message.starts_with("Invalid body"));
}

#[tokio::test]
async fn test_register_lands_in_caller_domain() {
    let ctx = TestContext::new().await;

    // A second system account in another tenant.
    let other = ctx
        .service
        .add_user(&ctx.store, new_user("t2", "portal", "p@t2.com", "pw"), true)
        .await
        .unwrap();
    let mut request = Package::new(
        Head::new("t2", "portal", 1, ctx.clock.now()),
        r#"{"Login":"alice","Name":"Alice","Email":"a@x.com","Password":"pw1"}"#,
    );
    request.set_secret(other.salt());
    request.sign().unwrap();
    let response = ctx
        .service
        .dispatch(&ctx.store, Operation::Register, request)
        .await;
    assert_eq!(response.head.code, 200);
    assert_eq!(TestContext::user_of(&response).domain, "t2");

    // Same login is still free in t1.
    assert_eq!(ctx.register("alice", "a@x.com", "pw1").await.head.code, 200);
}

#[tokio::test]
async fn test_add_user_bootstraps_system_accounts() {
    let ctx = TestContext::new().await;
    assert!(ctx.caller.is_system());
    assert_eq!(ctx.caller.domain(), DOMAIN);

    let err = ctx
        .service
        .add_user(&ctx.store, new_user("*", "root", "r@x.com", "pw"), true)
        .await
        .unwrap_err();
    assert!(err.is_validation_error());
}

#[test]
fn test_service_reports_its_driver() {
    let service = AuthService::new(Arc::new(PlaintextDriver::new()), ServiceOptions::default());
    assert_eq!(service.crypt_name(), "plaintext");
    assert!(service.options().permissions.is_empty());
}
