//! HTTP surface: routing, auth gate, parameter parsing and error mapping.
//!
//! Routes:
//! - `OPTIONS *` - CORS preflight, answered before anything else
//! - `GET /health` - liveness with uptime and version
//! - `GET /metrics` - Prometheus text exposition
//! - `GET|POST <render_path>` - the render endpoint (bearer credential required)

pub mod request;
pub mod response;

use bytes::Bytes;
use http::{Method, Response, StatusCode};
use std::time::Instant;

pub use request::{client_ip, extract_query_params, parse_render_request, ApiRequest};

use crate::auth::extract_bearer_token;
use crate::config::ServerConfig;
use crate::error::RenderError;
use crate::metrics::export_text;
use crate::render::RenderService;

pub const HEALTH_PATH: &str = "/health";
pub const METRICS_PATH: &str = "/metrics";

pub struct RenderApi {
    service: RenderService,
    render_path: String,
    cors_allow_origin: String,
    start_time: Instant,
}

impl RenderApi {
    pub fn new(service: RenderService, server: &ServerConfig) -> Self {
        Self {
            service,
            render_path: server.render_path.clone(),
            cors_allow_origin: server.cors_allow_origin.clone(),
            start_time: Instant::now(),
        }
    }

    pub fn render_path(&self) -> &str {
        &self.render_path
    }

    /// JSON error response with CORS headers, for failures raised outside
    /// [`handle`](Self::handle) (body limits, timeouts).
    pub fn error_response(&self, err: &RenderError) -> Response<Bytes> {
        response::error(err, &self.cors_allow_origin)
    }

    pub async fn handle(&self, request: ApiRequest) -> Response<Bytes> {
        let cors = self.cors_allow_origin.as_str();

        if request.method == Method::OPTIONS {
            return response::preflight(cors);
        }

        let path = request.uri.path();
        if request.method == Method::GET && path == HEALTH_PATH {
            return self.health();
        }
        if request.method == Method::GET && path == METRICS_PATH {
            return response::text("text/plain; version=0.0.4", export_text(), cors);
        }

        if path != self.render_path {
            return response::json(
                StatusCode::NOT_FOUND,
                &serde_json::json!({
                    "error": "Not found",
                    "details": format!("No route for {}", path),
                }),
                cors,
            );
        }

        if request.method != Method::GET && request.method != Method::POST {
            return self.error_response(&RenderError::MethodNotAllowed(request.method.to_string()));
        }

        let token = match extract_bearer_token(&request.headers) {
            Some(token) => token,
            None => {
                tracing::debug!(path = %path, "Rejecting request without bearer token");
                return self.error_response(&RenderError::Unauthorized(
                    "Missing bearer token in Authorization header".to_string(),
                ));
            }
        };

        let render_request = match parse_render_request(&request) {
            Ok(r) => r,
            Err(e) => return self.error_response(&e),
        };

        let client_ip = client_ip(&request);
        let outcome = self
            .service
            .render(render_request, &token, client_ip.as_deref())
            .await;

        let outcome_label = outcome.as_str();
        match outcome.into_result() {
            Ok(output) => response::binary(output, outcome_label, cors),
            Err(e) => self.error_response(&e),
        }
    }

    fn health(&self) -> Response<Bytes> {
        let body = serde_json::json!({
            "status": "healthy",
            "uptime_seconds": self.start_time.elapsed().as_secs(),
            "version": env!("CARGO_PKG_VERSION"),
        });
        response::json(StatusCode::OK, &body, &self.cors_allow_origin)
    }
}
