use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::auth::TokenSource;
use super::common::{ApiQueryParams, GoogleErrorEnvelope};
use super::error::ApiError;
use super::operation::OperationWaiter;
use super::transport::{RequestStats, Transport, TransportConfig};

pub const DEFAULT_RESOURCE_MANAGER_ENDPOINT: &str = "https://cloudresourcemanager.googleapis.com/v1";
pub const DEFAULT_BILLING_ENDPOINT: &str = "https://cloudbilling.googleapis.com/v1";
pub const DEFAULT_COMPUTE_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1";
pub const DEFAULT_SERVICE_USAGE_ENDPOINT: &str = "https://serviceusage.googleapis.com/v1";

/// The remote services this client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    ResourceManager,
    Billing,
    Compute,
    ServiceUsage,
}

/// Base URLs for each service, without a trailing slash
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub resource_manager: String,
    pub billing: String,
    pub compute: String,
    pub service_usage: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            resource_manager: DEFAULT_RESOURCE_MANAGER_ENDPOINT.to_string(),
            billing: DEFAULT_BILLING_ENDPOINT.to_string(),
            compute: DEFAULT_COMPUTE_ENDPOINT.to_string(),
            service_usage: DEFAULT_SERVICE_USAGE_ENDPOINT.to_string(),
        }
    }
}

impl Endpoints {
    /// Points every service at one base URL, as tests against a single
    /// mock server do
    pub fn all(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            resource_manager: base.clone(),
            billing: base.clone(),
            compute: base.clone(),
            service_usage: base,
        }
    }

    fn base(&self, service: Service) -> &str {
        let base = match service {
            Service::ResourceManager => &self.resource_manager,
            Service::Billing => &self.billing,
            Service::Compute => &self.compute,
            Service::ServiceUsage => &self.service_usage,
        };
        base.trim_end_matches('/')
    }
}

/// Google Cloud REST client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
    waiter: OperationWaiter,
}

struct ClientInner {
    http_client: reqwest::Client,
    endpoints: Endpoints,
    token_source: Arc<dyn TokenSource>,
    retry_config: RetryConfig,
    transport: Transport,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 30,
        }
    }
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(token_source: Arc<dyn TokenSource>, endpoints: Endpoints) -> Result<Self, ApiError> {
        Self::with_config(
            token_source,
            endpoints,
            RetryConfig::default(),
            TransportConfig::default(),
        )
    }

    /// Create a new API client with custom retry and transport configuration
    pub fn with_config(
        token_source: Arc<dyn TokenSource>,
        endpoints: Endpoints,
        retry_config: RetryConfig,
        mut transport_config: TransportConfig,
    ) -> Result<Self, ApiError> {
        transport_config.request_timeout =
            std::time::Duration::from_secs(retry_config.timeout_seconds);

        let transport = Transport::new(transport_config);
        let http_client = transport.build_client()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                endpoints,
                token_source,
                retry_config,
                transport,
            }),
            waiter: OperationWaiter::default(),
        })
    }

    /// Replace the polling cadence used for long-running operations
    pub fn with_waiter(mut self, waiter: OperationWaiter) -> Self {
        self.waiter = waiter;
        self
    }

    pub fn waiter(&self) -> &OperationWaiter {
        &self.waiter
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    /// Absolute URL for a service-relative path starting with `/`
    pub fn url(&self, service: Service, path: &str) -> String {
        format!("{}{}", self.inner.endpoints.base(service), path)
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        service: Service,
        path: &str,
    ) -> Result<T, ApiError> {
        self.send::<T, ()>(Method::GET, service, path, None).await
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params<T: for<'de> Deserialize<'de>>(
        &self,
        service: Service,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(service, &full_path).await
    }

    /// Execute a POST request with retry logic
    pub async fn post<T: for<'de> Deserialize<'de>, B: Serialize + Sync>(
        &self,
        service: Service,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(Method::POST, service, path, Some(body)).await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<T: for<'de> Deserialize<'de>, B: Serialize + Sync>(
        &self,
        service: Service,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send(Method::PUT, service, path, Some(body)).await
    }

    /// Execute a DELETE request with retry logic
    pub async fn delete<T: for<'de> Deserialize<'de>>(
        &self,
        service: Service,
        path: &str,
    ) -> Result<T, ApiError> {
        self.send::<T, ()>(Method::DELETE, service, path, None).await
    }

    pub async fn request_stats(&self) -> RequestStats {
        self.inner.transport.stats().await
    }

    async fn send<T: for<'de> Deserialize<'de>, B: Serialize + Sync>(
        &self,
        method: Method,
        service: Service,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let url = self.url(service, path);
        let token = self.inner.token_source.token().await?;
        let idempotent = method.is_idempotent();
        self.execute_with_retry(
            || async {
                tracing::debug!("{} request to: {}", method, url);

                let mut request = self
                    .inner
                    .http_client
                    .request(method.clone(), &url)
                    .bearer_auth(&token);
                if let Some(body) = body {
                    request = request.json(body);
                }
                request.send().await
            },
            &url,
            idempotent,
        )
        .await
    }

    /// Execute request with retry logic. Server errors and timeouts are only
    /// retried for idempotent requests since a POST may already have landed.
    async fn execute_with_retry<F, Fut, T>(
        &self,
        request_fn: F,
        url: &str,
        idempotent: bool,
    ) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
        T: for<'de> Deserialize<'de>,
    {
        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.inner.retry_config.max_retries {
            if attempt > 0 {
                let backoff = std::cmp::min(
                    self.inner.retry_config.initial_backoff_ms * (2_u64.pow(attempt - 1)),
                    self.inner.retry_config.max_backoff_ms,
                );
                tracing::debug!(
                    "Retrying request to {} after {}ms (attempt {})",
                    url,
                    backoff,
                    attempt
                );
                tokio::time::sleep(tokio::time::Duration::from_millis(backoff)).await;
            }

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        self.inner.transport.record_request(true).await;
                        return self.parse_success_response(response).await;
                    }

                    self.inner.transport.record_request(false).await;

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(ApiError::AuthError(format!(
                            "request to {} was rejected as unauthenticated",
                            url
                        )));
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() && idempotent {
                        last_error = Some(self.error_from_response(response).await);
                    } else {
                        return Err(self.error_from_response(response).await);
                    }
                }
                Err(e) => {
                    self.inner.transport.record_request(false).await;

                    if e.is_timeout() {
                        let timeout = ApiError::Timeout(self.inner.retry_config.timeout_seconds);
                        if !idempotent {
                            return Err(timeout);
                        }
                        last_error = Some(timeout);
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }

            attempt += 1;
        }

        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response; an empty body reads as `{}`
    async fn parse_success_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        let text = if text.trim().is_empty() { "{}" } else { &text };
        serde_json::from_str::<T>(text).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    async fn error_from_response(&self, response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        match serde_json::from_str::<GoogleErrorEnvelope>(&text) {
            Ok(envelope) => ApiError::ApiError {
                status,
                message: envelope.error.message.clone(),
                details: Some(Box::new(envelope.error)),
            },
            Err(_) => ApiError::ApiError {
                status,
                message: text,
                details: None,
            },
        }
    }
}
