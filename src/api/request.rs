//! Request parsing for the render endpoint.
//!
//! Parameters come from the query string and, for POST, a JSON object body.
//! Body fields win over query fields of the same name.

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::net::SocketAddr;

use crate::error::RenderError;
use crate::render::RenderRequest;

/// A fully-read HTTP request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub peer_addr: Option<SocketAddr>,
}

impl ApiRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            peer_addr: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::HeaderName::from_bytes(name.as_bytes()),
            http::HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_peer_addr(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }
}

/// Extract query parameters, percent-decoded.
pub fn extract_query_params(uri: &Uri) -> HashMap<String, String> {
    let mut params = HashMap::new();
    if let Some(query) = uri.query() {
        for pair in query.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                let value = value.replace('+', " ");
                params.insert(
                    urlencoding::decode(key).unwrap_or_default().to_string(),
                    urlencoding::decode(&value).unwrap_or_default().to_string(),
                );
            }
        }
    }
    params
}

/// Client address: first `X-Forwarded-For` hop, else the peer address.
pub fn client_ip(request: &ApiRequest) -> Option<String> {
    if let Some(forwarded_for) = request
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(client) = forwarded_for
            .split(',')
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return Some(client.to_string());
        }
    }
    request.peer_addr.map(|addr| addr.ip().to_string())
}

/// Merges query and body parameters into a [`RenderRequest`].
pub fn parse_render_request(request: &ApiRequest) -> Result<RenderRequest, RenderError> {
    let mut params: Map<String, Value> = extract_query_params(&request.uri)
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();

    if request.method == Method::POST && !request.body.iter().all(u8::is_ascii_whitespace) {
        let body: Value = serde_json::from_slice(&request.body)
            .map_err(|e| RenderError::BadRequest(format!("Invalid JSON body: {}", e)))?;
        match body {
            Value::Object(fields) => params.extend(fields),
            _ => {
                return Err(RenderError::BadRequest(
                    "Request body must be a JSON object".to_string(),
                ))
            }
        }
    }

    let bucket = string_param(&params, "bucket");
    let file = string_param(&params, "file");
    let (bucket, file) = match (bucket, file) {
        (Some(bucket), Some(file)) => (bucket, file),
        _ => {
            return Err(RenderError::BadRequest(
                "Missing required parameters: bucket and file".to_string(),
            ))
        }
    };

    let window = match (page_param(&params, "start")?, page_param(&params, "end")?) {
        (Some(start), Some(end)) => Some((start, end)),
        (None, None) => None,
        _ => {
            return Err(RenderError::InvalidRange(
                "start and end must be given together".to_string(),
            ))
        }
    };

    Ok(RenderRequest {
        bucket,
        file,
        watermark_text: string_param(&params, "watermark"),
        watermark_image: string_param(&params, "watermarkImage"),
        window,
        username: string_param(&params, "username"),
    })
}

/// Non-empty string value; numbers are accepted in their decimal form
fn string_param(params: &Map<String, Value>, name: &str) -> Option<String> {
    match params.get(name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Page number as integer or numeric string; absent, null and "" are None
fn page_param(params: &Map<String, Value>, name: &str) -> Result<Option<i64>, RenderError> {
    let invalid = |shown: &dyn std::fmt::Display| {
        RenderError::InvalidRange(format!("{} must be an integer page number, got {}", name, shown))
    };
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| invalid(s)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(page) => Ok(Some(page)),
            None => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
                _ => Err(invalid(n)),
            },
        },
        Some(other) => Err(invalid(other)),
    }
}
