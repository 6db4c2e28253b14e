// Test harness for integration tests
// Builds an in-process RenderApi over an in-memory store, plus document fixtures

use bytes::Bytes;
use http::{Method, Response};
use image::{ImageOutputFormat, Rgba, RgbaImage};
use inkmark::api::{ApiRequest, RenderApi};
use inkmark::config::{JwtConfig, RenderConfig, ServerConfig, WatermarkConfig};
use inkmark::identity::IdentityResolver;
use inkmark::render::RenderService;
use inkmark::store::InMemoryObjectStore;
use inkmark::watermark::WatermarkProvider;
use jsonwebtoken::{encode, EncodingKey, Header};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::Cursor;
use std::sync::Arc;

pub const JWT_SECRET: &str = "integration-test-secret";
pub const BUCKET: &str = "docs";

/// In-process render API that keeps a handle on its store
pub struct TestApp {
    pub api: RenderApi,
    pub store: Arc<InMemoryObjectStore>,
}

impl TestApp {
    pub fn new(store: InMemoryObjectStore) -> Self {
        Self::with_config(store, RenderConfig::default(), false)
    }

    pub fn with_config(store: InMemoryObjectStore, render: RenderConfig, strict: bool) -> Self {
        let store = Arc::new(store);
        let identity = IdentityResolver::new(
            Some(JwtConfig {
                secret: JWT_SECRET.to_string(),
                algorithm: "HS256".to_string(),
            }),
            None,
        )
        .with_require_valid_token(strict);
        let service = RenderService::new(
            store.clone(),
            identity,
            WatermarkProvider::new(WatermarkConfig::default()).expect("default watermark config"),
            render,
        );
        let server = ServerConfig {
            cors_allow_origin: "https://portal.example.com".to_string(),
            ..Default::default()
        };
        Self {
            api: RenderApi::new(service, &server),
            store,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Bytes> {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: serde_json::Value) -> Response<Bytes> {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response<Bytes> {
        let mut request = ApiRequest::new(method, uri.parse().expect("valid uri"))
            .with_peer_addr("198.51.100.7:40000".parse().expect("valid addr"));
        if let Some(token) = token {
            request = request.with_header("authorization", &format!("Bearer {}", token));
        }
        if let Some(body) = body {
            request = request
                .with_header("content-type", "application/json")
                .with_body(body.to_string());
        }
        self.api.handle(request).await
    }
}

/// HS256 token over arbitrary claims
pub fn sign_token(claims: serde_json::Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to generate JWT")
}

pub fn user_token() -> String {
    sign_token(serde_json::json!({
        "sub": "user-42",
        "email": "kim.minji@example.com",
        "exp": chrono::Utc::now().timestamp() + 3600,
    }))
}

pub fn json_body(response: &Response<Bytes>) -> serde_json::Value {
    serde_json::from_slice(response.body()).expect("JSON response body")
}

pub fn header<'a>(response: &'a Response<Bytes>, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

/// PDF whose page `n` (1-based) is `100 + n` points wide and 400 tall
pub fn pdf_fixture(pages: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let kids: Vec<Object> = (1..=pages)
        .map(|n| {
            let content = format!("BT /F1 12 Tf 20 360 Td (Page {}) Tj ET\n", n);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), Object::Integer(100 + i64::from(n)), 400.into()],
                "Contents" => content_id,
            })
            .into()
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => i64::from(pages),
            "Resources" => resources_id,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save fixture pdf");
    bytes
}

/// Page widths of a PDF in page order
pub fn page_widths(bytes: &[u8]) -> Vec<f32> {
    let doc = Document::load_mem(bytes).expect("response is a loadable PDF");
    doc.get_pages()
        .values()
        .map(|id| {
            let page = doc.get_object(*id).and_then(Object::as_dict).expect("page dictionary");
            let media_box = page
                .get(b"MediaBox")
                .and_then(Object::as_array)
                .expect("flattened MediaBox");
            let number = |o: &Object| match o {
                Object::Integer(i) => *i as f32,
                Object::Real(r) => *r as f32,
                other => panic!("unexpected MediaBox entry {:?}", other),
            };
            number(&media_box[2]) - number(&media_box[0])
        })
        .collect()
}

/// Grey gradient, so re-encoding artefacts and overlays are visible
pub fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let v = ((x + y) % 200) as u8 + 30;
        Rgba([v, v, v, 255])
    })
}

pub fn encode_fixture(image: &RgbaImage, format: ImageOutputFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image.clone())
        .to_rgb8()
        .write_to(&mut out, format)
        .expect("encode fixture image");
    out.into_inner()
}
