// Inkmark watermarking render service library

pub mod api;
pub mod asset;
pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod identity;
pub mod logging;
pub mod metrics;
pub mod pdf;
pub mod render;
pub mod server;
pub mod store;
pub mod watermark;
