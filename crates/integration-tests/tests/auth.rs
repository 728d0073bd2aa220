//! Integration tests for login, registration, and logout.

#![allow(clippy::unwrap_used)]

use milestone_integration_tests::{
    TAKEN_EMAIL, TestContext, USER_NAME, VALID_EMAIL, location, set_cookie_names,
};

#[tokio::test]
async fn test_login_success() {
    let ctx = TestContext::new().await;
    let resp = ctx
        .post_form("/login", &[("email", VALID_EMAIL), ("password", "changeme")])
        .await;

    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), Some("/"));
    assert_eq!(set_cookie_names(&resp), ["auth-token"]);

    let html = ctx.page("/").await;
    assert!(html.contains(USER_NAME));
    assert!(html.contains("Logout"));
}

#[tokio::test]
async fn test_login_failure_shows_server_message() {
    let ctx = TestContext::new().await;
    let resp = ctx
        .post_form("/login", &[("email", VALID_EMAIL), ("password", "wrong")])
        .await;

    assert_eq!(resp.status(), 401);
    assert!(location(&resp).is_none());
    assert!(set_cookie_names(&resp).is_empty());

    let html = resp.text().await.unwrap();
    assert!(html.contains("<dialog"));
    assert!(html.contains("Unauthorized"));
    assert!(html.contains(VALID_EMAIL));
}

#[tokio::test]
async fn test_logout() {
    let ctx = TestContext::new().await;
    ctx.login().await;

    let resp = ctx.post_form("/logout", &[]).await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), Some("/login"));

    let html = ctx.page("/").await;
    assert!(!html.contains(USER_NAME));
    assert!(html.contains("href=\"/login\""));
}

#[tokio::test]
async fn test_login_keeps_cart() {
    let ctx = TestContext::new().await;
    ctx.post_fragment("/cart/add", &[("product_id", "1")]).await;
    ctx.login().await;

    assert!(ctx.page("/cart/count").await.contains(">1<"));
}

#[tokio::test]
async fn test_register_mismatch_makes_no_api_call() {
    let ctx = TestContext::new().await;
    let resp = ctx
        .post_form(
            "/register",
            &[
                ("name", "Jane"),
                ("email", "jane@mail.com"),
                ("password", "secret1"),
                ("password_confirm", "secret2"),
            ],
        )
        .await;

    assert_eq!(resp.status(), 400);
    assert!(resp.text().await.unwrap().contains("Passwords do not match"));
    assert_eq!(ctx.api.hits(), 0);
}

#[tokio::test]
async fn test_register_success() {
    let ctx = TestContext::new().await;
    let resp = ctx
        .post_form(
            "/register",
            &[
                ("name", "Jane"),
                ("email", "jane@mail.com"),
                ("password", "secret"),
                ("password_confirm", "secret"),
            ],
        )
        .await;

    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), Some("/login?registered=1"));
    assert!(ctx.page("/login?registered=1").await.contains("Account created"));
}

#[tokio::test]
async fn test_register_failure() {
    let ctx = TestContext::new().await;
    let resp = ctx
        .post_form(
            "/register",
            &[
                ("name", "Jane"),
                ("email", TAKEN_EMAIL),
                ("password", "secret"),
                ("password_confirm", "secret"),
            ],
        )
        .await;

    assert!(location(&resp).is_none());
    let html = resp.text().await.unwrap();
    assert!(html.contains("Registration failed. Please try again."));
    assert!(html.contains(TAKEN_EMAIL));
}
