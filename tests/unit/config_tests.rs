// Configuration loading tests over complete YAML documents

use inkmark::config::*;
use inkmark::logging::LogFormat;

const FULL: &str = r##"
server:
  address: "0.0.0.0"
  port: 9090
  render_path: "/render"
  request_timeout: 60
  max_body_size: 1048576
  cors_allow_origin: "https://portal.example.com"
  log_format: pretty

storage:
  backend: s3
  s3:
    region: "ap-northeast-2"
    endpoint: "http://localhost:9000"
    access_key: "minio"
    secret_key: "minio-secret"
    force_path_style: true

identity:
  jwt:
    secret: "shared-secret"
    algorithm: "HS384"
  require_valid_token: true
  directory:
    type: static
    users:
      - id: "u-1"
        email: "kim.minji@example.com"
        display_name: "Kim Minji"

render:
  max_document_pages: 120
  max_window_pages: 300
  max_window_pages_large_source: 300
  jpeg_quality: 85

watermark:
  default_text: "INTERNAL USE ONLY"
  color: "#336699"
"##;

#[test]
fn test_full_config_deserializes_every_section() {
    let config = Config::from_yaml_with_env(FULL).expect("Failed to parse full config");

    assert_eq!(config.server.port, 9090);
    assert_eq!(config.server.render_path, "/render");
    assert_eq!(config.server.max_body_size, 1_048_576);
    assert_eq!(config.server.log_format, LogFormat::Pretty);

    assert_eq!(config.storage.backend, StorageBackend::S3);
    assert_eq!(config.storage.s3.endpoint.as_deref(), Some("http://localhost:9000"));
    assert!(config.storage.s3.force_path_style);
    assert!(config.storage.s3.has_static_credentials());

    let jwt = config.identity.jwt.as_ref().unwrap();
    assert_eq!(jwt.algorithm, "HS384");
    assert!(config.identity.require_valid_token);
    match config.identity.directory.as_ref().unwrap() {
        DirectoryConfig::Static { users } => {
            assert_eq!(users.len(), 1);
            assert_eq!(users[0].display_name, "Kim Minji");
        }
        other => panic!("expected static directory, got {:?}", other),
    }

    assert_eq!(config.render.max_document_pages, 120);
    assert_eq!(config.render.window_ceiling(1), 300);
    assert_eq!(config.render.jpeg_quality, 85);
    assert_eq!(config.watermark.default_text, "INTERNAL USE ONLY");

    config.validate().expect("full config is valid");
}

#[test]
fn test_omitted_sections_take_defaults() {
    let yaml = r#"
server:
  address: "127.0.0.1"
  port: 8080
storage:
  backend: filesystem
  filesystem:
    root: "/srv/objects"
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();

    assert_eq!(config.server.render_path, "/watermark");
    assert_eq!(config.server.cors_allow_origin, "*");
    assert_eq!(config.server.log_format, LogFormat::Json);
    assert!(config.identity.jwt.is_none());
    assert_eq!(config.render, RenderConfig::default());
    assert_eq!(config.watermark.default_text, "CONFIDENTIAL");
    assert!(config.validate().is_ok());
}

#[test]
fn test_rest_directory_config() {
    let yaml = r#"
server:
  address: "127.0.0.1"
  port: 8080
storage:
  backend: filesystem
  filesystem:
    root: "/srv/objects"
identity:
  jwt:
    secret: "s"
  directory:
    type: rest
    url: "https://db.example.com/rest/v1/profiles"
    api_key: "service-key"
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();

    match config.identity.directory.unwrap() {
        DirectoryConfig::Rest(rest) => {
            assert_eq!(rest.url, "https://db.example.com/rest/v1/profiles");
            assert_eq!(rest.name_column, "name");
            assert_eq!(rest.timeout_ms, 3000);
        }
        other => panic!("expected rest directory, got {:?}", other),
    }
}

#[test]
fn test_strict_token_mode_without_jwt_is_invalid() {
    let yaml = r#"
server:
  address: "127.0.0.1"
  port: 8080
storage:
  backend: filesystem
  filesystem:
    root: "/srv/objects"
identity:
  require_valid_token: true
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.contains("require_valid_token"), "{}", err);
}

#[test]
fn test_unsupported_jwt_algorithm_is_invalid() {
    let yaml = r#"
server:
  address: "127.0.0.1"
  port: 8080
storage:
  backend: filesystem
  filesystem:
    root: "/srv/objects"
identity:
  jwt:
    secret: "s"
    algorithm: "RS256"
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    assert!(config.validate().unwrap_err().contains("RS256"));
}

#[test]
fn test_unknown_backend_is_a_parse_error() {
    let yaml = r#"
server:
  address: "127.0.0.1"
  port: 8080
storage:
  backend: gcs
"#;
    assert!(Config::from_yaml_with_env(yaml).is_err());
}
