use serde_json::json;
use tollgate::{Operation, storage::StorageError};

use crate::context::{DOMAIN, TestContext};
use crate::helpers::new_user;

#[tokio::test]
async fn test_every_operation_releases_once() {
    let ctx = TestContext::new().await;
    let mut expected = ctx.releases();

    let token = ctx.session("alice", "a@x.com", "pw1").await;
    expected += 2;
    assert_eq!(ctx.releases(), expected);

    ctx.authenticate(&token).await;
    ctx.update(json!({ "Token": token, "Name": "Alice" })).await;
    ctx.logout(&token).await;
    expected += 3;
    assert_eq!(ctx.releases(), expected);
}

#[tokio::test]
async fn test_failures_release_too() {
    let ctx = TestContext::new().await;
    let mut expected = ctx.releases();

    // Bad body, bad credentials, bad token, conflict.
    ctx.call(Operation::Register, "[]").await;
    ctx.login("ghost", "pw").await;
    ctx.authenticate("missing").await;
    ctx.register("alice", "a@x.com", "pw1").await;
    ctx.register("alice", "a@x.com", "pw1").await;
    expected += 5;
    assert_eq!(ctx.releases(), expected);

    ctx.service
        .add_user(&ctx.store, new_user(DOMAIN, "bad login", "z@x.com", "pw"), false)
        .await
        .unwrap_err();
    expected += 1;
    assert_eq!(ctx.releases(), expected);
}

#[tokio::test]
async fn test_backend_failure_becomes_server_error() {
    let ctx = TestContext::new().await;
    let token = ctx.session("alice", "a@x.com", "pw1").await;
    let alice = ctx.store.fetch_user_by_token(&token).await.unwrap();
    let before = ctx.releases();

    ctx.conn().fail_on(
        alice.guid(),
        StorageError::Backend {
            reason: "connection reset".into(),
        },
    );
    let response = ctx.authenticate(&token).await;
    assert_eq!(response.head.code, 500);
    assert!(response.body.is_empty());
    assert!(ctx.verify(&response));
    assert_eq!(ctx.releases(), before + 1);

    ctx.conn().clear_faults();
    assert_eq!(ctx.authenticate(&token).await.head.code, 200);
}

#[tokio::test]
async fn test_concurrent_logins() {
    let ctx = std::sync::Arc::new(TestContext::new().await);
    for i in 0..8 {
        let response = ctx
            .register(&format!("user{i}"), &format!("u{i}@x.com"), "pw")
            .await;
        assert_eq!(response.head.code, 200);
    }

    let mut tasks = Vec::new();
    for i in 0..8 {
        let ctx = ctx.clone();
        tasks.push(tokio::spawn(async move {
            ctx.login(&format!("user{i}"), "pw").await
        }));
    }
    let mut tokens = Vec::new();
    for task in tasks {
        let response = task.await.unwrap();
        assert_eq!(response.head.code, 200);
        tokens.push(TestContext::user_of(&response).token);
    }
    tokens.sort();
    tokens.dedup();
    assert_eq!(tokens.len(), 8);
}

#[tokio::test]
async fn test_response_does_not_depend_on_last_error() {
    let ctx = TestContext::new().await;
    let response = ctx.authenticate("missing").await;
    assert_eq!(response.head.code, 404);
    // The closing release is the most recent store call.
    assert_eq!(ctx.store.last_error(), None);

    let token = ctx.session("alice", "a@x.com", "pw1").await;
    let alice = ctx.store.fetch_user_by_token(&token).await.unwrap();
    ctx.conn().fail_on(
        alice.guid(),
        StorageError::Backend {
            reason: "disk full".into(),
        },
    );
    let response = ctx.logout(&token).await;
    assert_eq!(response.head.code, 500);
    assert_eq!(ctx.store.last_error(), None);
}
