use tollgate::{
    Clock, Operation,
    envelope::{Head, Package},
};

use crate::context::{CALLER, DOMAIN, TestContext};

#[tokio::test]
async fn test_incomplete_header() {
    let ctx = TestContext::new().await;
    let before = ctx.releases();
    let request = Package::new(Head::new(DOMAIN, "", 5, ctx.clock.now()), "{}");
    let response = ctx
        .service
        .dispatch(&ctx.store, Operation::Login, request)
        .await;

    assert_eq!(response.head.code, 400);
    assert_eq!(response.head.message, "Header is not complete");
    assert_eq!(response.head.sequence, 5);
    assert!(response.head.signature.is_empty());
    assert_eq!(ctx.releases(), before + 1);
}

#[tokio::test]
async fn test_unknown_caller_is_forbidden() {
    let ctx = TestContext::new().await;
    let request = Package::new(Head::new(DOMAIN, "intruder", 1, ctx.clock.now()), "{}");
    let response = ctx
        .service
        .dispatch(&ctx.store, Operation::Register, request)
        .await;
    assert_eq!(response.head.code, 403);
    assert!(response.head.signature.is_empty());
}

#[tokio::test]
async fn test_regular_user_cannot_call() {
    let ctx = TestContext::new().await;
    assert_eq!(ctx.register("alice", "a@x.com", "pw1").await.head.code, 200);

    let request = Package::new(Head::new(DOMAIN, "alice", 1, ctx.clock.now()), "{}");
    let response = ctx
        .service
        .dispatch(&ctx.store, Operation::Login, request)
        .await;
    assert_eq!(response.head.code, 403);
}

#[tokio::test]
async fn test_deactivated_caller_is_forbidden() {
    let ctx = TestContext::new().await;
    let mut caller = ctx.caller.clone();
    caller.set_active(false);
    ctx.store.user_update(&caller).await.unwrap();

    let response = ctx.login("alice", "pw1").await;
    assert_eq!(response.head.code, 403);
}

#[tokio::test]
async fn test_resolve_caller() {
    let ctx = TestContext::new().await;
    let head = Head::new(DOMAIN, CALLER, 1, ctx.clock.now());
    let caller = ctx.service.resolve_caller(&ctx.store, &head).await.unwrap();
    assert_eq!(caller.guid(), ctx.caller.guid());

    // Login names are per domain.
    let head = Head::new("t2", CALLER, 1, ctx.clock.now());
    let err = ctx
        .service
        .resolve_caller(&ctx.store, &head)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 403);
}

#[tokio::test]
async fn test_stale_request_is_rejected() {
    let ctx = TestContext::new().await;
    let request = ctx.request(r#"{"Login":"alice","Password":"pw1"}"#);
    ctx.clock.advance_secs(121);

    let response = ctx
        .service
        .dispatch(&ctx.store, Operation::Login, request)
        .await;
    assert_eq!(response.head.code, 400);
    assert_eq!(response.head.message, "Request has expired");
    // The caller was known, so the rejection is signed.
    assert!(ctx.verify(&response));
}

#[tokio::test]
async fn test_request_from_the_future_is_rejected() {
    let ctx = TestContext::new().await;
    ctx.clock.advance_secs(121);
    let request = ctx.request("{}");
    ctx.clock.advance_secs(-121);

    let response = ctx
        .service
        .dispatch(&ctx.store, Operation::Authenticate, request)
        .await;
    assert_eq!(response.head.code, 400);
    assert_eq!(response.head.message, "Request timestamp is in the future");
}

#[tokio::test]
async fn test_unsigned_request_is_rejected() {
    let ctx = TestContext::new().await;
    let request = ctx.unsigned(r#"{"Login":"alice","Password":"pw1"}"#);
    let response = ctx
        .service
        .dispatch(&ctx.store, Operation::Login, request)
        .await;
    assert_eq!(response.head.code, 400);
    assert_eq!(response.head.message, "Signature does not match");
}

#[tokio::test]
async fn test_request_signed_with_wrong_salt() {
    let ctx = TestContext::new().await;
    let mut request = ctx.unsigned("{}");
    request.set_secret("not-the-caller-salt");
    request.sign().unwrap();
    let response = ctx
        .service
        .dispatch(&ctx.store, Operation::Logout, request)
        .await;
    assert_eq!(response.head.code, 400);
}
