//! Provider configuration
//!
//! Every setting can come from the provider block or from an environment
//! variable; the provider block wins.

use std::time::Duration;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::client::Endpoints;
use crate::api::transport::{TransportConfig, DEFAULT_USER_AGENT};
use crate::api::{AdcTokenSource, ApiError, Client, RetryConfig, StaticToken, TokenSource};
use std::sync::Arc;

pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
pub const REQUEST_TIMEOUT_ENV: &str = "GOOGLE_REQUEST_TIMEOUT";
pub const RESOURCE_MANAGER_ENDPOINT_ENV: &str = "GOOGLE_RESOURCE_MANAGER_CUSTOM_ENDPOINT";
pub const BILLING_ENDPOINT_ENV: &str = "GOOGLE_BILLING_CUSTOM_ENDPOINT";
pub const COMPUTE_ENDPOINT_ENV: &str = "GOOGLE_COMPUTE_CUSTOM_ENDPOINT";
pub const SERVICE_USAGE_ENDPOINT_ENV: &str = "GOOGLE_SERVICE_USAGE_CUSTOM_ENDPOINT";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// When unset, Application Default Credentials are used
    pub access_token: Option<String>,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub endpoints: Endpoints,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            endpoints: Endpoints::default(),
        }
    }
}

impl ProviderConfig {
    pub fn schema() -> Schema {
        let endpoint = |name: &str, service: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(&format!("Override the {} API base URL", service))
                .optional()
                .build()
        };

        SchemaBuilder::new()
            .description("Google Cloud provider")
            .attribute(
                AttributeBuilder::new("access_token", AttributeType::String)
                    .description("OAuth2 access token. Defaults to Application Default Credentials")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("request_timeout", AttributeType::Number)
                    .description("Per-request timeout in seconds")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("user_agent", AttributeType::String)
                    .description("User agent sent with every request")
                    .optional()
                    .build(),
            )
            .attribute(endpoint("resource_manager_custom_endpoint", "Resource Manager"))
            .attribute(endpoint("billing_custom_endpoint", "Cloud Billing"))
            .attribute(endpoint("compute_custom_endpoint", "Compute Engine"))
            .attribute(endpoint("service_usage_custom_endpoint", "Service Usage"))
            .build()
    }

    /// Resolves the provider block against the environment. All problems
    /// are collected rather than stopping at the first.
    pub fn resolve(config: &DynamicValue) -> Result<Self, Vec<Diagnostic>> {
        let mut diagnostics = Vec::new();
        let mut resolved = Self::default();

        resolved.access_token = setting(config, "access_token", ACCESS_TOKEN_ENV, &mut diagnostics)
            .filter(|t| !t.is_empty());

        if let Some(ua) = setting(config, "user_agent", "", &mut diagnostics) {
            resolved.user_agent = ua;
        }

        match request_timeout(config) {
            Ok(Some(timeout)) => resolved.request_timeout = timeout,
            Ok(None) => {}
            Err(diag) => diagnostics.push(diag),
        }

        let overrides = [
            (
                "resource_manager_custom_endpoint",
                RESOURCE_MANAGER_ENDPOINT_ENV,
                &mut resolved.endpoints.resource_manager,
            ),
            (
                "billing_custom_endpoint",
                BILLING_ENDPOINT_ENV,
                &mut resolved.endpoints.billing,
            ),
            (
                "compute_custom_endpoint",
                COMPUTE_ENDPOINT_ENV,
                &mut resolved.endpoints.compute,
            ),
            (
                "service_usage_custom_endpoint",
                SERVICE_USAGE_ENDPOINT_ENV,
                &mut resolved.endpoints.service_usage,
            ),
        ];
        for (attr, env, slot) in overrides {
            let Some(raw) = setting(config, attr, env, &mut diagnostics) else {
                continue;
            };
            match validate_endpoint(&raw) {
                Ok(endpoint) => *slot = endpoint,
                Err(detail) => diagnostics.push(
                    Diagnostic::error(format!("Invalid {}", attr), detail)
                        .with_attribute(AttributePath::new(attr)),
                ),
            }
        }

        if diagnostics.is_empty() {
            Ok(resolved)
        } else {
            Err(diagnostics)
        }
    }

    /// The configured access token, or Application Default Credentials
    pub async fn token_source(&self) -> Result<Arc<dyn TokenSource>, ApiError> {
        match &self.access_token {
            Some(token) => Ok(Arc::new(StaticToken::new(token.clone()))),
            None => Ok(Arc::new(AdcTokenSource::new().await?)),
        }
    }

    pub fn client(&self, token_source: Arc<dyn TokenSource>) -> Result<Client, ApiError> {
        let retry = RetryConfig {
            timeout_seconds: self.request_timeout.as_secs(),
            ..Default::default()
        };
        let transport = TransportConfig {
            user_agent: self.user_agent.clone(),
            ..Default::default()
        };
        Client::with_config(token_source, self.endpoints.clone(), retry, transport)
    }
}

/// String setting from the provider block, falling back to `env` when it
/// names a variable
fn setting(
    config: &DynamicValue,
    attr: &str,
    env: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<String> {
    match config.get_optional_string(&AttributePath::new(attr)) {
        Ok(Some(value)) => return Some(value),
        Ok(None) => {}
        Err(e) => {
            diagnostics.push(
                Diagnostic::error(format!("Invalid {}", attr), e.to_string())
                    .with_attribute(AttributePath::new(attr)),
            );
            return None;
        }
    }

    if env.is_empty() {
        return None;
    }
    std::env::var(env).ok().filter(|v| !v.is_empty())
}

fn request_timeout(config: &DynamicValue) -> Result<Option<Duration>, Diagnostic> {
    let path = AttributePath::new("request_timeout");
    let invalid = |detail: String| {
        Diagnostic::error("Invalid request_timeout", detail).with_attribute(path.clone())
    };

    let secs = match config.get_number(&path) {
        Ok(n) => n,
        Err(e) if e.is_missing() => match std::env::var(REQUEST_TIMEOUT_ENV) {
            Ok(raw) if !raw.is_empty() => raw.trim().parse::<f64>().map_err(|_| {
                invalid(format!("{} must be a number of seconds, got {:?}", REQUEST_TIMEOUT_ENV, raw))
            })?,
            _ => return Ok(None),
        },
        Err(e) => return Err(invalid(e.to_string())),
    };

    if !secs.is_finite() || secs < 1.0 {
        return Err(invalid(format!(
            "request_timeout must be at least 1 second, got {}",
            secs
        )));
    }
    Ok(Some(Duration::from_secs(secs as u64)))
}

fn validate_endpoint(raw: &str) -> Result<String, String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("{:?} is not a valid URL: {}", raw, e))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("{:?} must use http or https", raw));
    }
    Ok(raw.trim_end_matches('/').to_string())
}
