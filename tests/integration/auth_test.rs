// Bearer credential gate and identity resolution through the HTTP surface

use inkmark::config::RenderConfig;
use inkmark::store::InMemoryObjectStore;

use super::test_harness::{header, json_body, pdf_fixture, sign_token, user_token, TestApp, BUCKET};

fn app(strict: bool) -> TestApp {
    TestApp::with_config(
        InMemoryObjectStore::new().with_object(BUCKET, "manual.pdf", pdf_fixture(3), Some("application/pdf")),
        RenderConfig::default(),
        strict,
    )
}

#[tokio::test]
async fn test_missing_bearer_is_rejected_before_any_storage_access() {
    let app = app(false);

    let response = app.get("/watermark?bucket=docs&file=manual.pdf", None).await;

    assert_eq!(response.status(), 401);
    assert_eq!(json_body(&response)["error"], "Unauthorized");
    assert_eq!(
        header(&response, "access-control-allow-origin"),
        Some("https://portal.example.com")
    );
    assert_eq!(app.store.total_calls(), 0);
}

#[tokio::test]
async fn test_non_bearer_authorization_is_rejected() {
    let app = app(false);

    let request = inkmark::api::ApiRequest::new(
        http::Method::GET,
        "/watermark?bucket=docs&file=manual.pdf".parse().unwrap(),
    )
    .with_header("authorization", "Basic dXNlcjpwYXNz");
    let response = app.api.handle(request).await;
    assert_eq!(response.status(), 401);
    assert_eq!(app.store.total_calls(), 0);
}

#[tokio::test]
async fn test_opaque_token_renders_with_sentinel_identity() {
    let app = app(false);

    let response = app
        .get("/watermark?bucket=docs&file=manual.pdf", Some("not-a-jwt"))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "content-type"), Some("application/pdf"));
}

#[tokio::test]
async fn test_strict_mode_rejects_invalid_token_without_storage_access() {
    let app = app(true);

    let response = app
        .get("/watermark?bucket=docs&file=manual.pdf", Some("not-a-jwt"))
        .await;

    assert_eq!(response.status(), 401);
    assert!(json_body(&response)["details"]
        .as_str()
        .unwrap()
        .starts_with("Invalid bearer token"));
    assert_eq!(app.store.total_calls(), 0);
}

#[tokio::test]
async fn test_strict_mode_accepts_valid_token() {
    let app = app(true);

    let response = app
        .get("/watermark?bucket=docs&file=manual.pdf", Some(&user_token()))
        .await;

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_strict_mode_rejects_expired_token() {
    let app = app(true);
    let expired = sign_token(serde_json::json!({
        "sub": "user-42",
        "exp": chrono::Utc::now().timestamp() - 3600,
    }));

    let response = app
        .get("/watermark?bucket=docs&file=manual.pdf", Some(&expired))
        .await;

    assert_eq!(response.status(), 401);
}
