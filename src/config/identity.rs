//! Identity resolution configuration.
//!
//! Controls how the display name stamped into watermarks is derived when the
//! caller does not supply one:
//!
//! 1. `jwt` - the bearer credential is validated with this secret/algorithm
//! 2. `directory` - user rows are looked up by id, then by email
//!
//! With `require_valid_token: true` an invalid bearer credential is rejected
//! with 401 instead of falling back to the sentinel identity.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_DIRECTORY_TIMEOUT_MS;

/// Supported JWT signing algorithms (HMAC only)
pub const SUPPORTED_JWT_ALGORITHMS: &[&str] = &["HS256", "HS384", "HS512"];

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_directory_timeout() -> u64 {
    DEFAULT_DIRECTORY_TIMEOUT_MS
}

fn default_name_column() -> String {
    "name".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
}

/// A user row in the static directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StaticUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub display_name: String,
}

/// PostgREST-style user table endpoint.
///
/// Lookups issue `GET {url}?{column}=eq.{value}&select={name_column}` and read
/// `name_column` from the first returned row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestDirectoryConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_name_column")]
    pub name_column: String,
    #[serde(default = "default_directory_timeout")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DirectoryConfig {
    Static { users: Vec<StaticUser> },
    Rest(RestDirectoryConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt: Option<JwtConfig>,
    #[serde(default)]
    pub require_valid_token: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<DirectoryConfig>,
}

impl IdentityConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(jwt) = &self.jwt {
            if jwt.secret.is_empty() {
                return Err("identity.jwt.secret cannot be empty".to_string());
            }
            if !SUPPORTED_JWT_ALGORITHMS.contains(&jwt.algorithm.as_str()) {
                return Err(format!(
                    "identity.jwt.algorithm '{}' is not supported. Supported algorithms: {}",
                    jwt.algorithm,
                    SUPPORTED_JWT_ALGORITHMS.join(", ")
                ));
            }
        }

        if self.require_valid_token && self.jwt.is_none() {
            return Err(
                "identity.require_valid_token needs identity.jwt to be configured".to_string(),
            );
        }

        if let Some(DirectoryConfig::Rest(rest)) = &self.directory {
            if rest.url.trim().is_empty() {
                return Err("identity.directory.url cannot be empty".to_string());
            }
            if rest.timeout_ms == 0 {
                return Err("identity.directory.timeout_ms must be > 0".to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_config_defaults_to_no_lookups() {
        let config: IdentityConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.jwt.is_none());
        assert!(config.directory.is_none());
        assert!(!config.require_valid_token);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_static_directory_parses() {
        let yaml = r#"
jwt:
  secret: "s3cret"
directory:
  type: static
  users:
    - id: "u-1"
      email: "kim@example.com"
      display_name: "Kim Minji"
"#;
        let config: IdentityConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.jwt.as_ref().unwrap().algorithm, "HS256");
        match config.directory {
            Some(DirectoryConfig::Static { users }) => {
                assert_eq!(users.len(), 1);
                assert_eq!(users[0].display_name, "Kim Minji");
            }
            other => panic!("expected static directory, got {:?}", other),
        }
    }

    #[test]
    fn test_rest_directory_defaults() {
        let yaml = r#"
directory:
  type: rest
  url: "https://db.example.com/rest/v1/users"
"#;
        let config: IdentityConfig = serde_yaml::from_str(yaml).unwrap();
        match config.directory {
            Some(DirectoryConfig::Rest(rest)) => {
                assert_eq!(rest.name_column, "name");
                assert_eq!(rest.timeout_ms, DEFAULT_DIRECTORY_TIMEOUT_MS);
                assert!(rest.api_key.is_none());
            }
            other => panic!("expected rest directory, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_algorithm_rejected() {
        let config = IdentityConfig {
            jwt: Some(JwtConfig {
                secret: "s".to_string(),
                algorithm: "RS256".to_string(),
            }),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("RS256"));
    }

    #[test]
    fn test_strict_mode_requires_jwt() {
        let config = IdentityConfig {
            require_valid_token: true,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
