//! Response construction.
//!
//! Every response leaves through [`finish`], which attaches the CORS
//! headers, so no path can forget them.

use bytes::Bytes;
use http::header::{
    HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, CONTENT_DISPOSITION, CONTENT_TYPE,
};
use http::{Response, StatusCode};

use crate::constants::DEFAULT_PASSTHROUGH_CONTENT_TYPE;
use crate::error::RenderError;
use crate::render::RenderedOutput;

pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
pub const ALLOWED_HEADERS: &str = "authorization, content-type, x-client-info, apikey";
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Outcome of the render, for clients and log correlation
pub const RENDER_OUTCOME_HEADER: &str = "x-render-outcome";

fn insert(response: &mut Response<Bytes>, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        response.headers_mut().insert(name, value);
    }
}

fn finish(
    status: StatusCode,
    content_type: &str,
    body: Bytes,
    cors_origin: &str,
) -> Response<Bytes> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    let content_type = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_PASSTHROUGH_CONTENT_TYPE));
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    insert(&mut response, ACCESS_CONTROL_ALLOW_ORIGIN, cors_origin);
    insert(&mut response, ACCESS_CONTROL_ALLOW_METHODS, ALLOWED_METHODS);
    insert(&mut response, ACCESS_CONTROL_ALLOW_HEADERS, ALLOWED_HEADERS);
    response
}

pub fn preflight(cors_origin: &str) -> Response<Bytes> {
    let mut response = finish(StatusCode::NO_CONTENT, "text/plain", Bytes::new(), cors_origin);
    insert(&mut response, ACCESS_CONTROL_MAX_AGE, PREFLIGHT_MAX_AGE);
    response
}

pub fn json(status: StatusCode, value: &serde_json::Value, cors_origin: &str) -> Response<Bytes> {
    finish(
        status,
        "application/json",
        Bytes::from(value.to_string()),
        cors_origin,
    )
}

/// `{"error": label, "details": message}` with the error's status
pub fn error(err: &RenderError, cors_origin: &str) -> Response<Bytes> {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = serde_json::json!({
        "error": err.label(),
        "details": err.to_string(),
    });
    json(status, &body, cors_origin)
}

pub fn text(content_type: &str, body: String, cors_origin: &str) -> Response<Bytes> {
    finish(StatusCode::OK, content_type, Bytes::from(body), cors_origin)
}

/// Rendered bytes, displayed inline under the original file name
pub fn binary(output: RenderedOutput, outcome: &str, cors_origin: &str) -> Response<Bytes> {
    let disposition = content_disposition(&output.filename);
    let mut response = finish(StatusCode::OK, &output.content_type, output.bytes, cors_origin);
    insert(&mut response, CONTENT_DISPOSITION, &disposition);
    insert(
        &mut response,
        HeaderName::from_static(RENDER_OUTCOME_HEADER),
        outcome,
    );
    response
}

/// `inline; filename="..."`, plus an RFC 5987 `filename*` when the name is
/// not plain ASCII.
pub fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    if ascii == filename {
        format!("inline; filename=\"{}\"", ascii)
    } else {
        format!(
            "inline; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            urlencoding::encode(filename)
        )
    }
}
