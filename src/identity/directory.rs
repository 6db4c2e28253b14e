//! User directories consulted by the identity resolver.
//!
//! A directory answers "what is the display name of the user with this id /
//! this email". Two backends exist: a static list from configuration and a
//! PostgREST-style HTTP table.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::{RestDirectoryConfig, StaticUser};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory request failed: {0}")]
    Request(String),
    #[error("directory returned status {0}")]
    Status(u16),
    #[error("directory response could not be parsed: {0}")]
    Parse(String),
}

/// Lookup of display names by stable user id or account email
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<String>, DirectoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<String>, DirectoryError>;
}

/// Directory backed by the `identity.directory.users` config list
pub struct StaticUserDirectory {
    users: Vec<StaticUser>,
}

impl StaticUserDirectory {
    pub fn new(users: Vec<StaticUser>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl UserDirectory for StaticUserDirectory {
    async fn find_by_id(&self, id: &str) -> Result<Option<String>, DirectoryError> {
        Ok(self
            .users
            .iter()
            .find(|user| user.id == id)
            .map(|user| user.display_name.clone())
            .filter(|name| !name.trim().is_empty()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<String>, DirectoryError> {
        Ok(self
            .users
            .iter()
            .find(|user| {
                user.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email))
            })
            .map(|user| user.display_name.clone())
            .filter(|name| !name.trim().is_empty()))
    }
}

/// Directory backed by a PostgREST-style user table
pub struct RestUserDirectory {
    client: reqwest::Client,
    config: RestDirectoryConfig,
}

impl RestUserDirectory {
    pub fn new(config: RestDirectoryConfig) -> Result<Self, DirectoryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| DirectoryError::Request(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn request_url(&self, column: &str, value: &str) -> Result<reqwest::Url, DirectoryError> {
        reqwest::Url::parse_with_params(
            &self.config.url,
            &[
                (column, format!("eq.{}", value)),
                ("select", self.config.name_column.clone()),
            ],
        )
        .map_err(|e| DirectoryError::Request(e.to_string()))
    }

    async fn lookup(&self, column: &str, value: &str) -> Result<Option<String>, DirectoryError> {
        let url = self.request_url(column, value)?;
        let mut request = self.client.get(url).header("Accept", "application/json");
        if let Some(api_key) = &self.config.api_key {
            request = request.header("apikey", api_key).bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DirectoryError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(DirectoryError::Status(response.status().as_u16()));
        }

        let rows: Value = response
            .json()
            .await
            .map_err(|e| DirectoryError::Parse(e.to_string()))?;
        first_name_in_rows(&rows, &self.config.name_column)
    }
}

/// Reads `column` from the first row of a JSON array response
pub(crate) fn first_name_in_rows(rows: &Value, column: &str) -> Result<Option<String>, DirectoryError> {
    let rows = rows
        .as_array()
        .ok_or_else(|| DirectoryError::Parse("expected a JSON array of rows".to_string()))?;

    Ok(rows
        .first()
        .and_then(|row| row.get(column))
        .and_then(Value::as_str)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty()))
}

#[async_trait]
impl UserDirectory for RestUserDirectory {
    async fn find_by_id(&self, id: &str) -> Result<Option<String>, DirectoryError> {
        self.lookup("id", id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<String>, DirectoryError> {
        self.lookup("email", email).await
    }
}
