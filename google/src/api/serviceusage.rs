//! Service Usage v1 service enablement

use async_trait::async_trait;
use serde::Serialize;

use super::client::{Client, Service};
use super::common::Operation;
use super::error::ApiError;

/// API that has to be enabled before a project's networks can be managed
pub const COMPUTE_SERVICE: &str = "compute.googleapis.com";

#[derive(Debug, Default, Serialize)]
struct EnableServiceRequest {}

#[async_trait]
pub trait ServiceUsageApi: Send + Sync {
    async fn enable_service(&self, project_id: &str, service: &str)
        -> Result<Operation, ApiError>;

    async fn wait_service_operation(&self, op: Operation, activity: &str)
        -> Result<(), ApiError>;
}

#[async_trait]
impl ServiceUsageApi for Client {
    /// POST /projects/{project}/services/{service}:enable
    async fn enable_service(
        &self,
        project_id: &str,
        service: &str,
    ) -> Result<Operation, ApiError> {
        tracing::debug!("enabling {} on project {}", service, project_id);
        self.post(
            Service::ServiceUsage,
            &format!("/projects/{}/services/{}:enable", project_id, service),
            &EnableServiceRequest::default(),
        )
        .await
    }

    /// GET /{operation.name}
    async fn wait_service_operation(
        &self,
        op: Operation,
        activity: &str,
    ) -> Result<(), ApiError> {
        self.waiter()
            .wait(op, activity, |name| async move {
                self.get::<Operation>(Service::ServiceUsage, &format!("/{}", name))
                    .await
            })
            .await
            .map(|_| ())
    }
}
