//! Server configuration types.
//!
//! This module defines the server-level configuration including:
//! - Address and port bindings
//! - The render endpoint path and CORS origin
//! - Request timeout and body size limit
//!
//! Default values are sourced from `crate::constants`.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CORS_ALLOW_ORIGIN, DEFAULT_MAX_BODY_SIZE, DEFAULT_RENDER_PATH,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::logging::LogFormat;

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_body_size() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

fn default_render_path() -> String {
    DEFAULT_RENDER_PATH.to_string()
}

fn default_cors_allow_origin() -> String {
    DEFAULT_CORS_ALLOW_ORIGIN.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// Path the render endpoint is mounted on (default: /watermark)
    #[serde(default = "default_render_path")]
    pub render_path: String,
    /// Whole-request timeout in seconds, covering fetch and render
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Maximum request body size in bytes (default: 8 MB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    #[serde(default = "default_cors_allow_origin")]
    pub cors_allow_origin: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8080,
            render_path: default_render_path(),
            request_timeout: default_request_timeout(),
            max_body_size: default_max_body_size(),
            cors_allow_origin: default_cors_allow_origin(),
            log_format: LogFormat::default(),
        }
    }
}
