//! OAuth2 access tokens for the Google APIs
//!
//! Either a fixed token supplied through provider configuration, or
//! Application Default Credentials resolved through `gcp_auth`.

use async_trait::async_trait;
use gcp_auth::TokenProvider;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::error::ApiError;

/// Scope covering every API this provider calls
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Refresh tokens this long before they expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Assumed lifetime when the credential source does not say
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String, ApiError>;
}

/// A caller-supplied token, used as is for every request
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String, ApiError> {
        Ok(self.0.clone())
    }
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Application Default Credentials with an in-memory token cache
pub struct AdcTokenSource {
    provider: Arc<dyn TokenProvider>,
    cache: RwLock<Option<CachedToken>>,
}

impl AdcTokenSource {
    pub async fn new() -> Result<Self, ApiError> {
        let provider = gcp_auth::provider().await.map_err(|e| {
            ApiError::AuthError(format!(
                "failed to load application default credentials: {}",
                e
            ))
        })?;

        Ok(Self {
            provider,
            cache: RwLock::new(None),
        })
    }
}

#[async_trait]
impl TokenSource for AdcTokenSource {
    async fn token(&self) -> Result<String, ApiError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.is_valid()) {
                return Ok(cached.token.clone());
            }
        }

        let token = self
            .provider
            .token(DEFAULT_SCOPES)
            .await
            .map_err(|e| ApiError::AuthError(format!("failed to get access token: {}", e)))?;
        let token = token.as_str().to_string();

        let mut cache = self.cache.write().await;
        *cache = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER,
        });
        tracing::debug!("cached new access token");

        Ok(token)
    }
}
