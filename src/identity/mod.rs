//! Identity resolution for watermark display names.
//!
//! Given an optional caller-supplied username and the bearer credential, the
//! resolver produces exactly one display string:
//!
//! 1. a caller-supplied username that is not the `USER` sentinel, verbatim
//! 2. the directory row matching the token's stable user id (`sub`)
//! 3. the directory row matching the token's `email`
//! 4. the local part of the token's `email`
//! 5. the `CONFIDENTIAL` sentinel
//!
//! Steps 2-4 are [`LookupStrategy`] values evaluated in order; the first to
//! yield a name wins. Every failure along the way is logged and absorbed,
//! unless `require_valid_token` is set, in which case an invalid credential
//! is an [`RenderError::Unauthorized`].

pub mod directory;

use std::sync::Arc;

use crate::auth::{validate_jwt, Claims};
use crate::config::{DirectoryConfig, IdentityConfig, JwtConfig};
use crate::constants::{SENTINEL_IDENTITY, SENTINEL_USERNAME};
use crate::error::RenderError;

pub use directory::{DirectoryError, RestUserDirectory, StaticUserDirectory, UserDirectory};

/// Where a resolved display name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    Caller,
    UserId,
    Email,
    EmailLocalPart,
    Sentinel,
}

impl IdentitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentitySource::Caller => "caller",
            IdentitySource::UserId => "user_id",
            IdentitySource::Email => "email",
            IdentitySource::EmailLocalPart => "email_local_part",
            IdentitySource::Sentinel => "sentinel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub display_name: String,
    pub source: IdentitySource,
}

impl ResolvedIdentity {
    fn new(display_name: impl Into<String>, source: IdentitySource) -> Self {
        Self {
            display_name: display_name.into(),
            source,
        }
    }

    pub fn sentinel() -> Self {
        Self::new(SENTINEL_IDENTITY, IdentitySource::Sentinel)
    }
}

/// One step of the token-based fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// Directory lookup by the token's `sub` claim
    UserId,
    /// Directory lookup by the token's `email` claim
    Email,
    /// The part of the token's `email` before `@`
    EmailLocalPart,
}

impl LookupStrategy {
    pub const DEFAULT_ORDER: [LookupStrategy; 3] = [
        LookupStrategy::UserId,
        LookupStrategy::Email,
        LookupStrategy::EmailLocalPart,
    ];

    fn source(&self) -> IdentitySource {
        match self {
            LookupStrategy::UserId => IdentitySource::UserId,
            LookupStrategy::Email => IdentitySource::Email,
            LookupStrategy::EmailLocalPart => IdentitySource::EmailLocalPart,
        }
    }

    async fn lookup(
        &self,
        claims: &Claims,
        directory: Option<&dyn UserDirectory>,
    ) -> Result<Option<String>, DirectoryError> {
        match self {
            LookupStrategy::UserId => match (directory, claims.sub.as_deref()) {
                (Some(directory), Some(sub)) if !sub.is_empty() => directory.find_by_id(sub).await,
                _ => Ok(None),
            },
            LookupStrategy::Email => match (directory, claims.email.as_deref()) {
                (Some(directory), Some(email)) if !email.is_empty() => {
                    directory.find_by_email(email).await
                }
                _ => Ok(None),
            },
            LookupStrategy::EmailLocalPart => Ok(claims.email.as_deref().and_then(email_local_part)),
        }
    }
}

/// `"kim.minji@example.com"` → `"kim.minji"`
pub fn email_local_part(email: &str) -> Option<String> {
    email
        .split_once('@')
        .map(|(local, _)| local.trim())
        .filter(|local| !local.is_empty())
        .map(str::to_string)
}

pub struct IdentityResolver {
    jwt: Option<JwtConfig>,
    require_valid_token: bool,
    directory: Option<Arc<dyn UserDirectory>>,
    strategies: Vec<LookupStrategy>,
}

impl IdentityResolver {
    pub fn new(jwt: Option<JwtConfig>, directory: Option<Arc<dyn UserDirectory>>) -> Self {
        Self {
            jwt,
            require_valid_token: false,
            directory,
            strategies: LookupStrategy::DEFAULT_ORDER.to_vec(),
        }
    }

    /// Builds the resolver and its directory backend from configuration
    pub fn from_config(config: &IdentityConfig) -> Result<Self, RenderError> {
        let directory: Option<Arc<dyn UserDirectory>> = match &config.directory {
            None => None,
            Some(DirectoryConfig::Static { users }) => {
                Some(Arc::new(StaticUserDirectory::new(users.clone())))
            }
            Some(DirectoryConfig::Rest(rest)) => Some(Arc::new(
                RestUserDirectory::new(rest.clone())
                    .map_err(|e| RenderError::Configuration(e.to_string()))?,
            )),
        };

        Ok(Self::new(config.jwt.clone(), directory)
            .with_require_valid_token(config.require_valid_token))
    }

    pub fn with_require_valid_token(mut self, strict: bool) -> Self {
        self.require_valid_token = strict;
        self
    }

    pub fn with_strategies(mut self, strategies: Vec<LookupStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    fn validate(&self, token: &str) -> Result<Claims, String> {
        let jwt = self
            .jwt
            .as_ref()
            .ok_or_else(|| "no JWT secret configured".to_string())?;
        validate_jwt(token, &jwt.secret, &jwt.algorithm).map_err(|e| e.to_string())
    }

    /// Resolves the display name for one request.
    ///
    /// Only fails in strict mode, for a credential that does not validate.
    pub async fn resolve(
        &self,
        caller_username: Option<&str>,
        token: &str,
    ) -> Result<ResolvedIdentity, RenderError> {
        let mut claims = None;
        if self.require_valid_token {
            match self.validate(token) {
                Ok(c) => claims = Some(c),
                Err(reason) => {
                    tracing::warn!(reason = %reason, "Rejecting request with invalid bearer token");
                    return Err(RenderError::Unauthorized(format!(
                        "Invalid bearer token: {}",
                        reason
                    )));
                }
            }
        }

        if let Some(name) = caller_username
            .map(str::trim)
            .filter(|name| !name.is_empty() && *name != SENTINEL_USERNAME)
        {
            return Ok(ResolvedIdentity::new(name, IdentitySource::Caller));
        }

        let claims = match claims {
            Some(c) => c,
            None => match self.validate(token) {
                Ok(c) => c,
                Err(reason) => {
                    tracing::debug!(reason = %reason, "Token not usable for identity lookup, using sentinel");
                    return Ok(ResolvedIdentity::sentinel());
                }
            },
        };

        for strategy in &self.strategies {
            match strategy.lookup(&claims, self.directory.as_deref()).await {
                Ok(Some(name)) => return Ok(ResolvedIdentity::new(name, strategy.source())),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(strategy = ?strategy, error = %e, "Identity lookup failed, trying next strategy");
                }
            }
        }

        Ok(ResolvedIdentity::sentinel())
    }
}
