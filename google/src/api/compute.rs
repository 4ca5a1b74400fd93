//! Compute Engine v1 networks, firewalls and global operations

use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};

use super::client::{Client, Service};
use super::common::ApiQueryParams;
use super::error::ApiError;
use super::operation::{LongRunning, OperationState};

/// Canonical self link of a global network. Filters match against this form
/// whichever endpoint the client talks to.
pub fn network_self_link(project_id: &str, network: &str) -> String {
    format!(
        "https://www.googleapis.com/compute/v1/projects/{}/global/networks/{}",
        project_id, network
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Firewall {
    pub name: String,
    #[serde(default)]
    pub network: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirewallList {
    #[serde(default)]
    pub items: Vec<Firewall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationErrorItem {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationErrors {
    #[serde(default)]
    pub errors: Vec<OperationErrorItem>,
}

/// Compute's own operation shape: `status` instead of `done`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeOperation {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationErrors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_error_status_code: Option<i32>,
}

impl LongRunning for ComputeOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> OperationState {
        if let Some(error) = self.error.as_ref().filter(|e| !e.errors.is_empty()) {
            return OperationState::Failed {
                code: self.http_error_status_code.unwrap_or_default(),
                message: error
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", e.code, e.message))
                    .collect::<Vec<_>>()
                    .join("; "),
            };
        }
        if self.status == "DONE" {
            OperationState::Done
        } else {
            OperationState::Running
        }
    }
}

/// Network and firewall inventory
#[async_trait]
pub trait ComputeApi: Send + Sync {
    async fn list_firewalls(
        &self,
        project_id: &str,
        filter: &str,
        page_token: Option<&str>,
    ) -> Result<FirewallList, ApiError>;

    async fn delete_firewall(
        &self,
        project_id: &str,
        firewall: &str,
    ) -> Result<ComputeOperation, ApiError>;

    async fn delete_network(
        &self,
        project_id: &str,
        network: &str,
    ) -> Result<ComputeOperation, ApiError>;

    async fn wait_compute_operation(
        &self,
        project_id: &str,
        op: ComputeOperation,
        activity: &str,
    ) -> Result<(), ApiError>;
}

/// Streams firewall pages matching `filter`, following page tokens until
/// the listing is exhausted
pub fn firewall_pages<'a>(
    api: &'a dyn ComputeApi,
    project_id: &'a str,
    filter: &'a str,
) -> impl Stream<Item = Result<Vec<Firewall>, ApiError>> + Send + 'a {
    // None = finished, Some(None) = first page, Some(Some(t)) = next page
    stream::try_unfold(Some(None::<String>), move |cursor| async move {
        let Some(token) = cursor else {
            return Ok::<_, ApiError>(None);
        };
        let page = api
            .list_firewalls(project_id, filter, token.as_deref())
            .await?;
        let next = page.next_page_token.filter(|t| !t.is_empty()).map(Some);
        Ok(Some((page.items, next)))
    })
}

#[async_trait]
impl ComputeApi for Client {
    /// GET /projects/{project}/global/firewalls
    async fn list_firewalls(
        &self,
        project_id: &str,
        filter: &str,
        page_token: Option<&str>,
    ) -> Result<FirewallList, ApiError> {
        let params = ApiQueryParams::new()
            .add("filter", filter)
            .add_optional("pageToken", page_token);
        self.get_with_params(
            Service::Compute,
            &format!("/projects/{}/global/firewalls", project_id),
            &params,
        )
        .await
    }

    /// DELETE /projects/{project}/global/firewalls/{firewall}
    async fn delete_firewall(
        &self,
        project_id: &str,
        firewall: &str,
    ) -> Result<ComputeOperation, ApiError> {
        self.delete(
            Service::Compute,
            &format!("/projects/{}/global/firewalls/{}", project_id, firewall),
        )
        .await
    }

    /// DELETE /projects/{project}/global/networks/{network}
    async fn delete_network(
        &self,
        project_id: &str,
        network: &str,
    ) -> Result<ComputeOperation, ApiError> {
        self.delete(
            Service::Compute,
            &format!("/projects/{}/global/networks/{}", project_id, network),
        )
        .await
    }

    /// GET /projects/{project}/global/operations/{operation}
    async fn wait_compute_operation(
        &self,
        project_id: &str,
        op: ComputeOperation,
        activity: &str,
    ) -> Result<(), ApiError> {
        self.waiter()
            .wait(op, activity, |name| async move {
                self.get::<ComputeOperation>(
                    Service::Compute,
                    &format!("/projects/{}/global/operations/{}", project_id, name),
                )
                .await
            })
            .await
            .map(|_| ())
    }
}
