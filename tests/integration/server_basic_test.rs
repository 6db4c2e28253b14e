// Render service over a real TCP listener

use inkmark::config::ServerConfig;
use inkmark::server::RenderServer;
use inkmark::store::InMemoryObjectStore;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use super::test_harness::{page_widths, pdf_fixture, user_token, TestApp, BUCKET};

#[tokio::test]
async fn test_render_over_http_and_graceful_shutdown() {
    let app = TestApp::new(InMemoryObjectStore::new().with_object(
        BUCKET,
        "handbook.pdf",
        pdf_fixture(4),
        Some("application/pdf"),
    ));
    let server = RenderServer::new(app.api, &ServerConfig::default());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve(listener, async {
        let _ = stopped.await;
    }));

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/watermark", base_url))
        .query(&[("bucket", "docs"), ("file", "handbook.pdf"), ("start", "3"), ("end", "4")])
        .bearer_auth(user_token())
        .header("x-forwarded-for", "203.0.113.9")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/pdf"
    );
    let body = response.bytes().await.unwrap();
    assert_eq!(page_widths(&body), vec![103.0, 104.0]);

    let unauthorized = client
        .post(format!("{}/watermark", base_url))
        .json(&serde_json::json!({"bucket": "docs", "file": "handbook.pdf"}))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), 401);

    stop.send(()).unwrap();
    handle.await.unwrap().unwrap();

    assert!(client
        .get(format!("{}/health", base_url))
        .send()
        .await
        .is_err());
}
