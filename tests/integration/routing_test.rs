// Routing, CORS and built-in endpoints

use http::Method;
use inkmark::store::InMemoryObjectStore;

use super::test_harness::{header, json_body, pdf_fixture, user_token, TestApp, BUCKET};

fn app() -> TestApp {
    TestApp::new(
        InMemoryObjectStore::new().with_object(BUCKET, "a.pdf", pdf_fixture(2), Some("application/pdf")),
    )
}

fn assert_cors(response: &http::Response<bytes::Bytes>) {
    assert_eq!(
        header(response, "access-control-allow-origin"),
        Some("https://portal.example.com")
    );
    assert_eq!(
        header(response, "access-control-allow-methods"),
        Some("GET, POST, OPTIONS")
    );
    assert_eq!(
        header(response, "access-control-allow-headers"),
        Some("authorization, content-type, x-client-info, apikey")
    );
}

#[tokio::test]
async fn test_preflight_needs_no_credentials() {
    let app = app();

    let response = app.send(Method::OPTIONS, "/watermark", None, None).await;

    assert_eq!(response.status(), 204);
    assert!(response.body().is_empty());
    assert_cors(&response);
    assert_eq!(app.store.total_calls(), 0);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = app();

    let response = app.get("/health", None).await;

    assert_eq!(response.status(), 200);
    assert_cors(&response);
    let body = json_body(&response);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_metrics_endpoint_reports_renders() {
    let app = app();
    let rendered = app
        .get("/watermark?bucket=docs&file=a.pdf", Some(&user_token()))
        .await;
    assert_eq!(rendered.status(), 200);

    let response = app.get("/metrics", None).await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        header(&response, "content-type"),
        Some("text/plain; version=0.0.4")
    );
    let text = std::str::from_utf8(response.body()).unwrap();
    assert!(text.contains("inkmark_render_requests_total"));
    assert!(text.contains("inkmark_render_duration_seconds"));
}

#[tokio::test]
async fn test_unknown_path_is_404_with_cors() {
    let app = app();

    let response = app.get("/nope", Some(&user_token())).await;

    assert_eq!(response.status(), 404);
    assert_cors(&response);
    assert_eq!(app.store.total_calls(), 0);
}

#[tokio::test]
async fn test_unsupported_method_is_405() {
    let app = app();

    for method in [Method::PUT, Method::DELETE, Method::PATCH] {
        let response = app
            .send(method.clone(), "/watermark?bucket=docs&file=a.pdf", Some(&user_token()), None)
            .await;
        assert_eq!(response.status(), 405, "{}", method);
        assert_cors(&response);
        assert_eq!(json_body(&response)["error"], "Method not allowed");
    }
    assert_eq!(app.store.total_calls(), 0);
}

#[tokio::test]
async fn test_missing_parameters_are_400() {
    let app = app();

    let response = app.get("/watermark?bucket=docs", Some(&user_token())).await;

    assert_eq!(response.status(), 400);
    assert_cors(&response);
    assert_eq!(json_body(&response)["error"], "Bad request");
    assert_eq!(app.store.total_calls(), 0);
}

#[tokio::test]
async fn test_malformed_json_body_is_400() {
    let app = app();
    let request = inkmark::api::ApiRequest::new(Method::POST, "/watermark".parse().unwrap())
        .with_header("authorization", &format!("Bearer {}", user_token()))
        .with_body("{\"bucket\": ");

    let response = app.api.handle(request).await;

    assert_eq!(response.status(), 400);
    assert_cors(&response);
}
