// Raster rendering end to end: format preservation, passthrough, degraded original

use base64::Engine;
use image::{GenericImageView, ImageFormat, ImageOutputFormat, Rgba, RgbaImage};
use inkmark::store::InMemoryObjectStore;

use super::test_harness::{encode_fixture, gradient, header, user_token, TestApp, BUCKET};

#[tokio::test]
async fn test_jpeg_stays_jpeg_with_same_dimensions() {
    let original = encode_fixture(&gradient(320, 200), ImageOutputFormat::Jpeg(90));
    let app = TestApp::new(InMemoryObjectStore::new().with_object(
        BUCKET,
        "photos/site.jpg",
        original.clone(),
        Some("image/jpeg"),
    ));

    let response = app
        .get("/watermark?bucket=docs&file=photos/site.jpg", Some(&user_token()))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "content-type"), Some("image/jpeg"));
    assert_eq!(header(&response, "x-render-outcome"), Some("rendered"));
    assert_ne!(response.body().as_ref(), original.as_slice());

    assert_eq!(image::guess_format(response.body()).unwrap(), ImageFormat::Jpeg);
    let decoded = image::load_from_memory(response.body()).unwrap();
    assert_eq!(decoded.dimensions(), (320, 200));
}

#[tokio::test]
async fn test_png_stays_png_with_overlay() {
    let source = RgbaImage::from_pixel(128, 96, Rgba([255, 255, 255, 255]));
    let original = encode_fixture(&source, ImageOutputFormat::Png);
    let app = TestApp::new(InMemoryObjectStore::new().with_object(
        BUCKET,
        "diagram.png",
        original,
        None,
    ));

    let response = app
        .get("/watermark?bucket=docs&file=diagram.png", Some(&user_token()))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "content-type"), Some("image/png"));
    let decoded = image::load_from_memory(response.body()).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (128, 96));
    assert!(
        decoded.pixels().any(|p| p.0 != [255, 255, 255, 255]),
        "watermark left no trace on a blank canvas"
    );
}

#[tokio::test]
async fn test_supplied_watermark_raster_is_used() {
    let mark = RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 255]));
    let mut png = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(mark)
        .write_to(&mut png, ImageOutputFormat::Png)
        .unwrap();
    let supplied = base64::engine::general_purpose::STANDARD.encode(png.into_inner());

    let source = RgbaImage::from_pixel(64, 64, Rgba([255, 255, 255, 255]));
    let app = TestApp::new(InMemoryObjectStore::new().with_object(
        BUCKET,
        "blank.png",
        encode_fixture(&source, ImageOutputFormat::Png),
        Some("image/png"),
    ));

    let response = app
        .post(
            "/watermark",
            Some(&user_token()),
            serde_json::json!({
                "bucket": "docs",
                "file": "blank.png",
                "watermarkImage": format!("data:image/png;base64,{}", supplied),
            }),
        )
        .await;

    assert_eq!(response.status(), 200);
    let decoded = image::load_from_memory(response.body()).unwrap().to_rgba8();
    assert!(
        decoded.pixels().any(|p| p.0[0] > p.0[1] && p.0[0] > p.0[2]),
        "expected red tint from the supplied raster"
    );
}

#[tokio::test]
async fn test_very_long_watermark_text_renders_normally() {
    let source = RgbaImage::from_pixel(200, 120, Rgba([255, 255, 255, 255]));
    let app = TestApp::new(InMemoryObjectStore::new().with_object(
        BUCKET,
        "scan.png",
        encode_fixture(&source, ImageOutputFormat::Png),
        Some("image/png"),
    ));

    let response = app
        .post(
            "/watermark",
            Some(&user_token()),
            serde_json::json!({
                "bucket": "docs",
                "file": "scan.png",
                "watermark": "A".repeat(200_000),
                "username": "B".repeat(50_000),
            }),
        )
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "x-render-outcome"), Some("rendered"));
    let decoded = image::load_from_memory(response.body()).unwrap();
    assert_eq!(decoded.dimensions(), (200, 120));
}

#[tokio::test]
async fn test_passthrough_content_is_returned_unchanged() {
    let app = TestApp::new(InMemoryObjectStore::new().with_object(
        BUCKET,
        "notes/readme.txt",
        &b"plain text, not watermarked"[..],
        Some("text/plain"),
    ));

    let response = app
        .get("/watermark?bucket=docs&file=notes/readme.txt", Some(&user_token()))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "content-type"), Some("text/plain"));
    assert_eq!(header(&response, "x-render-outcome"), Some("passthrough"));
    assert_eq!(response.body().as_ref(), b"plain text, not watermarked");
}

#[tokio::test]
async fn test_passthrough_without_declared_type_falls_back() {
    let app = TestApp::new(InMemoryObjectStore::new().with_object(
        BUCKET,
        "blob.bin",
        vec![0u8, 1, 2, 3],
        None,
    ));

    let response = app
        .get("/watermark?bucket=docs&file=blob.bin", Some(&user_token()))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "content-type"), Some("application/octet-stream"));
    assert_eq!(response.body().as_ref(), &[0u8, 1, 2, 3]);
}

#[tokio::test]
async fn test_undecodable_image_serves_original() {
    let original = b"\xff\xd8\xff\xe0 truncated jpeg".to_vec();
    let app = TestApp::new(InMemoryObjectStore::new().with_object(
        BUCKET,
        "broken.jpg",
        original.clone(),
        Some("image/jpeg"),
    ));

    let response = app
        .get("/watermark?bucket=docs&file=broken.jpg", Some(&user_token()))
        .await;

    assert_eq!(response.status(), 200);
    assert_eq!(header(&response, "content-type"), Some("image/jpeg"));
    assert_eq!(header(&response, "x-render-outcome"), Some("degraded_original"));
    assert_eq!(response.body().as_ref(), original.as_slice());
}
