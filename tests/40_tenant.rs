mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

use common::{spawn_app, FakeIdentity, PLATFORM_HOST, TENANT_HOST};

#[tokio::test]
async fn unknown_host_gets_not_found_page_and_is_cached() {
    let app = spawn_app(FakeIdentity::default()).await;
    let lookup = app
        .backend
        .mock_async(|when, then| {
            when.path("/tenant-domain/context").header("x-forwarded-host", "nowhere.test");
            then.status(404).json_body(json!({ "error": "not found" }));
        })
        .await;
    app.set_host("nowhere.test");

    for _ in 0..2 {
        let res = app.get("/coach").await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert!(res.body.contains("tenant-not-found"));
    }
    lookup.assert_hits_async(1).await;
}

#[tokio::test]
async fn tenant_lookup_uses_normalized_host() {
    let app = spawn_app(FakeIdentity::default()).await;
    app.set_host("ACME.test:8443");

    let res = app.get("/coach").await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(
        common::query_param(res.location(), "redirect_uri").as_deref(),
        Some(format!("http://{}/auth/callback", TENANT_HOST).as_str())
    );
}

#[tokio::test]
async fn platform_host_skips_tenant_lookup() {
    let app = spawn_app(FakeIdentity::default()).await;
    let lookup = app
        .backend
        .mock_async(|when, then| {
            when.path("/tenant-domain/context").header("x-forwarded-host", PLATFORM_HOST);
            then.status(500);
        })
        .await;
    app.set_host(PLATFORM_HOST);

    let res = app.get("/super-admin").await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    lookup.assert_hits_async(0).await;
}

#[tokio::test]
async fn backend_failure_is_bad_gateway() {
    let app = spawn_app(FakeIdentity::default()).await;
    app.backend
        .mock_async(|when, then| {
            when.path("/tenant-domain/context").header("x-forwarded-host", "broken.test");
            then.status(500).json_body(json!({ "error": "db down" }));
        })
        .await;
    app.set_host("broken.test");

    assert_eq!(app.get("/coach").await.status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn request_without_host_is_rejected() {
    let app = spawn_app(FakeIdentity::default()).await;
    let request = Request::builder().uri("/coach").body(Body::empty()).unwrap();

    let res = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
