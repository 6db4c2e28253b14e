// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod identity;
pub mod render;
pub mod server;
pub mod storage;
pub mod watermark;

pub use identity::{DirectoryConfig, IdentityConfig, JwtConfig, RestDirectoryConfig, StaticUser};
pub use render::RenderConfig;
pub use server::ServerConfig;
pub use storage::{FilesystemConfig, S3Config, StorageBackend, StorageConfig};
pub use watermark::WatermarkConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub watermark: WatermarkConfig,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.address.trim().is_empty() {
            return Err("server.address cannot be empty".to_string());
        }
        if self.server.port == 0 {
            return Err("server.port must be > 0".to_string());
        }
        if !self.server.render_path.starts_with('/') {
            return Err(format!(
                "server.render_path '{}' does not start with /",
                self.server.render_path
            ));
        }
        if matches!(self.server.render_path.as_str(), "/health" | "/metrics") {
            return Err(format!(
                "server.render_path '{}' collides with a built-in endpoint",
                self.server.render_path
            ));
        }
        if self.server.max_body_size == 0 {
            return Err("server.max_body_size must be > 0".to_string());
        }
        if http::HeaderValue::from_str(&self.server.cors_allow_origin).is_err() {
            return Err(format!(
                "server.cors_allow_origin {:?} is not a valid header value",
                self.server.cors_allow_origin
            ));
        }
        if self.server.request_timeout == 0 {
            return Err("server.request_timeout must be > 0 seconds".to_string());
        }

        self.storage.validate()?;
        self.identity.validate()?;
        self.render.validate()?;
        self.watermark.validate()?;

        Ok(())
    }
}
