mod common;

use axum::http::{Method, StatusCode};
use httpmock::prelude::*;
use serde_json::json;

use common::{spawn_app, FakeIdentity, TENANT_HOST, TENANT_ID};

#[tokio::test]
async fn context_requires_a_signed_in_session() {
    let app = spawn_app(FakeIdentity::default()).await;
    let res = app.get("/session/context").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.json()["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn context_describes_user_tenant_and_home() {
    let app = spawn_app(FakeIdentity::default()).await;
    app.sign_in_as("u-coach", &["coach", "volunteer"], "/coach").await;

    let res = app.get("/session/context").await;
    assert_eq!(res.status, StatusCode::OK);

    let data = &res.json()["data"];
    assert_eq!(data["home"], "/coach");
    assert_eq!(data["roles"], json!(["coach", "volunteer"]));
    assert_eq!(data["tenant"]["kind"], "tenant");
    assert_eq!(data["tenant"]["tenant"]["id"], TENANT_ID);
    assert_eq!(data["user"]["subject"], "u-coach");
    assert!(data["user"].get("tokens").is_none(), "tokens must not reach the browser");
}

#[tokio::test]
async fn api_requests_are_forwarded_with_session_credentials() {
    let app = spawn_app(FakeIdentity::default()).await;
    app.sign_in_as("u-admin", &["admin"], "/admin").await;

    let create = app
        .backend
        .mock_async(|when, then| {
            when.method(POST)
                .path("/programs")
                .query_param("draft", "true")
                .header("authorization", "Bearer access-u-admin")
                .header("x-tenant-id", TENANT_ID)
                .header("x-forwarded-host", TENANT_HOST)
                .json_body(json!({ "name": "Robotics" }));
            then.status(201).json_body(json!({ "id": "p-1", "name": "Robotics" }));
        })
        .await;

    let res = app
        .request(Method::POST, "/api/programs?draft=true", Some(json!({ "name": "Robotics" })))
        .await;

    create.assert_hits_async(1).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.json()["id"], "p-1");
}

#[tokio::test]
async fn backend_errors_are_relayed_unchanged() {
    let app = spawn_app(FakeIdentity::default()).await;
    app.sign_in_as("u-admin", &["admin"], "/admin").await;
    app.backend
        .mock_async(|when, then| {
            when.method(GET).path("/programs/missing");
            then.status(404).json_body(json!({ "error": "program not found" }));
        })
        .await;

    let res = app.get("/api/programs/missing").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json()["error"], "program not found");
}

#[tokio::test]
async fn api_requires_a_signed_in_session() {
    let app = spawn_app(FakeIdentity::default()).await;
    let res = app.get("/api/programs").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}
