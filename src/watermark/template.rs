//! Template variable substitution for the fallback watermark text.
//!
//! # Supported Variables
//!
//! - `{{user}}` - Resolved display name
//! - `{{text}}` - Watermark text from the request (or the configured default)
//! - `{{ip}}` - Client IP address (X-Forwarded-For aware)
//! - `{{bucket}}`, `{{file}}` - Requested object
//! - `{{date}}` - Render date (YYYY-MM-DD)
//! - `{{datetime}}` - Render time, ISO 8601
//! - `{{timestamp}}` - Render time, Unix seconds
//!
//! Unknown variables resolve to an empty string. Every value is cut to
//! [`MAX_TEMPLATE_VALUE_CHARS`] characters.

use regex::Regex;
use std::sync::OnceLock;

use crate::constants::MAX_TEMPLATE_VALUE_CHARS;

static TEMPLATE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn get_template_pattern() -> &'static Regex {
    TEMPLATE_PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([a-z_]+)\s*\}\}").expect("Invalid template regex - this is a compile-time bug")
    })
}

/// Values available to a template, captured once per request so every
/// line agrees on the render time.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    user: String,
    text: String,
    ip: Option<String>,
    bucket: Option<String>,
    file: Option<String>,
    timestamp: i64,
}

impl TemplateContext {
    pub fn new(user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            text: text.into(),
            ip: None,
            bucket: None,
            file: None,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn with_ip(mut self, ip: Option<impl Into<String>>) -> Self {
        self.ip = ip.map(Into::into);
        self
    }

    pub fn with_object(mut self, bucket: impl Into<String>, file: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self.file = Some(file.into());
        self
    }

    /// Pins the render time, for deterministic output.
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Resolves all `{{variable}}` occurrences in `template`.
pub fn resolve_template(template: &str, context: &TemplateContext) -> String {
    get_template_pattern()
        .replace_all(template, |caps: &regex::Captures| {
            resolve_variable(&caps[1], context)
        })
        .into_owned()
}

fn resolve_variable(var_name: &str, context: &TemplateContext) -> String {
    let value = match var_name {
        "user" => context.user.clone(),
        "text" => context.text.clone(),
        "ip" => context.ip.clone().unwrap_or_default(),
        "bucket" => context.bucket.clone().unwrap_or_default(),
        "file" => context.file.clone().unwrap_or_default(),
        "date" => format_timestamp(context.timestamp, "%Y-%m-%d"),
        "datetime" => format_timestamp(context.timestamp, "%Y-%m-%dT%H:%M:%SZ"),
        "timestamp" => context.timestamp.to_string(),
        _ => String::new(),
    };
    truncate_chars(&value, MAX_TEMPLATE_VALUE_CHARS)
}

/// The first `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

fn format_timestamp(timestamp: i64, format: &str) -> String {
    use chrono::{TimeZone, Utc};
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.format(format).to_string())
        .unwrap_or_default()
}

/// Replaces everything outside printable ASCII with `?`.
///
/// The embedded fallback font only guarantees Latin coverage.
pub fn ascii_safe(text: &str) -> String {
    text.chars()
        .map(|c| if c == ' ' || c.is_ascii_graphic() { c } else { '?' })
        .collect()
}
