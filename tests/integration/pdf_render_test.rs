// PDF rendering end to end: page windows, ceilings and failure statuses

use inkmark::config::RenderConfig;
use inkmark::store::InMemoryObjectStore;
use rstest::rstest;

use super::test_harness::{header, json_body, page_widths, pdf_fixture, user_token, TestApp, BUCKET};

fn store_with(key: &str, pages: u32) -> InMemoryObjectStore {
    InMemoryObjectStore::new().with_object(BUCKET, key, pdf_fixture(pages), Some("application/pdf"))
}

#[tokio::test]
async fn test_window_returns_exactly_the_requested_pages() {
    let app = TestApp::new(store_with("reports/q3.pdf", 10));

    let response = app
        .get(
            "/watermark?bucket=docs&file=reports%2Fq3.pdf&start=2&end=4",
            Some(&user_token()),
        )
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "content-type"), Some("application/pdf"));
    assert_eq!(
        header(&response, "content-disposition"),
        Some("inline; filename=\"q3.pdf\"")
    );
    assert_eq!(header(&response, "x-render-outcome"), Some("rendered"));
    assert_eq!(page_widths(response.body()), vec![102.0, 103.0, 104.0]);
}

#[tokio::test]
async fn test_whole_document_without_window() {
    let app = TestApp::new(store_with("a.pdf", 5));

    let response = app
        .get("/watermark?bucket=docs&file=a.pdf", Some(&user_token()))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        page_widths(response.body()),
        vec![101.0, 102.0, 103.0, 104.0, 105.0]
    );
}

#[tokio::test]
async fn test_post_body_window() {
    let app = TestApp::new(store_with("a.pdf", 8));

    let response = app
        .post(
            "/watermark",
            Some(&user_token()),
            serde_json::json!({
                "bucket": "docs",
                "file": "a.pdf",
                "start": "7",
                "end": 8,
                "username": "Park Jisoo",
            }),
        )
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(page_widths(response.body()), vec![107.0, 108.0]);
}

#[tokio::test]
async fn test_single_page_window_at_the_end() {
    let app = TestApp::new(store_with("a.pdf", 6));

    let response = app
        .get("/watermark?bucket=docs&file=a.pdf&start=6&end=6", Some(&user_token()))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(page_widths(response.body()), vec![106.0]);
}

#[rstest]
#[case("start=4&end=2")]
#[case("start=0&end=2")]
#[case("start=3&end=11")]
#[case("start=-1&end=3")]
#[tokio::test]
async fn test_invalid_windows_are_400(#[case] window: &str) {
    let app = TestApp::new(store_with("a.pdf", 10));

    let response = app
        .get(&format!("/watermark?bucket=docs&file=a.pdf&{}", window), Some(&user_token()))
        .await;

    assert_eq!(response.status(), 400, "{}", window);
    assert_eq!(json_body(&response)["error"], "Invalid page range");
}

#[tokio::test]
async fn test_large_document_without_window_is_rejected() {
    let app = TestApp::new(store_with("catalog.pdf", 885));

    let response = app
        .get("/watermark?bucket=docs&file=catalog.pdf", Some(&user_token()))
        .await;

    assert_eq!(response.status(), 400);
    let body = json_body(&response);
    assert_eq!(body["error"], "Document too large");
    assert!(body["details"].as_str().unwrap().contains("885 pages"));
}

#[tokio::test]
async fn test_large_window_within_raised_ceiling() {
    let config = RenderConfig {
        max_window_pages: 300,
        max_window_pages_large_source: 300,
        ..Default::default()
    };
    let app = TestApp::with_config(store_with("catalog.pdf", 885), config, false);

    let response = app
        .get(
            "/watermark?bucket=docs&file=catalog.pdf&start=296&end=590",
            Some(&user_token()),
        )
        .await;

    assert_eq!(response.status(), 200);
    let widths = page_widths(response.body());
    assert_eq!(widths.len(), 295);
    assert_eq!(widths.first().copied(), Some(396.0));
    assert_eq!(widths.last().copied(), Some(690.0));
}

#[tokio::test]
async fn test_window_over_ceiling_is_rejected() {
    let app = TestApp::new(store_with("a.pdf", 100));

    let response = app
        .get("/watermark?bucket=docs&file=a.pdf&start=1&end=60", Some(&user_token()))
        .await;

    assert_eq!(response.status(), 400);
    assert_eq!(json_body(&response)["error"], "Page range too large");
}

#[tokio::test]
async fn test_large_source_uses_the_lower_window_ceiling() {
    let config = RenderConfig {
        large_source_bytes: 1,
        ..Default::default()
    };
    let app = TestApp::with_config(store_with("a.pdf", 40), config, false);

    let response = app
        .get("/watermark?bucket=docs&file=a.pdf&start=1&end=31", Some(&user_token()))
        .await;
    assert_eq!(response.status(), 400);
    assert!(json_body(&response)["details"]
        .as_str()
        .unwrap()
        .contains("at most 30 pages"));

    let response = app
        .get("/watermark?bucket=docs&file=a.pdf&start=1&end=30", Some(&user_token()))
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(page_widths(response.body()).len(), 30);
}

#[tokio::test]
async fn test_corrupt_pdf_is_500_json() {
    let app = TestApp::new(InMemoryObjectStore::new().with_object(
        BUCKET,
        "broken.pdf",
        &b"%PDF-1.4 this is not a document"[..],
        Some("application/pdf"),
    ));

    let response = app
        .get("/watermark?bucket=docs&file=broken.pdf", Some(&user_token()))
        .await;

    assert_eq!(response.status(), 500);
    assert_eq!(header(&response, "content-type"), Some("application/json"));
    assert_eq!(json_body(&response)["error"], "Processing failed");
}

#[tokio::test]
async fn test_missing_file_names_the_file() {
    let app = TestApp::new(store_with("a.pdf", 1));

    let response = app
        .get("/watermark?bucket=docs&file=missing.pdf", Some(&user_token()))
        .await;

    assert_eq!(response.status(), 404);
    assert_eq!(
        json_body(&response)["details"],
        "File 'missing.pdf' not found in bucket 'docs'"
    );
    assert_eq!(app.store.get_calls(), 0);
}

#[tokio::test]
async fn test_missing_bucket_lists_available_buckets() {
    let app = TestApp::new(store_with("a.pdf", 1).with_bucket("archive"));

    let response = app
        .get("/watermark?bucket=nope&file=a.pdf", Some(&user_token()))
        .await;

    assert_eq!(response.status(), 404);
    assert_eq!(
        json_body(&response)["details"],
        "Bucket 'nope' not found. Available buckets: archive, docs"
    );
}

#[tokio::test]
async fn test_oversized_object_is_rejected_before_download() {
    let config = RenderConfig {
        max_object_bytes: 100,
        ..Default::default()
    };
    let app = TestApp::with_config(store_with("a.pdf", 3), config, false);

    let response = app
        .get("/watermark?bucket=docs&file=a.pdf", Some(&user_token()))
        .await;

    assert_eq!(response.status(), 400);
    assert_eq!(json_body(&response)["error"], "File too large");
    assert_eq!(app.store.get_calls(), 0);
}
