//! Provider data structure passed to resources

use crate::api::{BillingApi, Client, ComputeApi, ProjectsApi, ServiceUsageApi};
use std::sync::Arc;
use std::time::Duration;

/// Tuning for the reconciler's own polling, separate from HTTP retries
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOptions {
    pub billing_poll_attempts: u32,
    pub billing_poll_interval: Duration,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            billing_poll_attempts: 3,
            billing_poll_interval: Duration::from_secs(3),
        }
    }
}

#[derive(Clone)]
pub struct GoogleProviderData {
    pub projects: Arc<dyn ProjectsApi>,
    pub billing: Arc<dyn BillingApi>,
    pub compute: Arc<dyn ComputeApi>,
    pub service_usage: Arc<dyn ServiceUsageApi>,
    pub options: ReconcileOptions,
}

impl GoogleProviderData {
    /// One HTTP client serving every capability
    pub fn new(client: Client) -> Self {
        let client = Arc::new(client);
        Self {
            projects: client.clone(),
            billing: client.clone(),
            compute: client.clone(),
            service_usage: client,
            options: ReconcileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }
}

impl std::fmt::Debug for GoogleProviderData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProviderData")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
