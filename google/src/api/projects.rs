//! Cloud Resource Manager v1 projects

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::client::{Client, Service};
use super::common::{string_or_i64, Empty, Operation};
use super::error::ApiError;

/// Lifecycle state of a project that is present and usable
pub const LIFECYCLE_ACTIVE: &str = "ACTIVE";

/// Parent of a project in the resource hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceId {
    /// `organization` or `folder`
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl ResourceId {
    pub fn organization(id: impl Into<String>) -> Self {
        Self {
            kind: "organization".to_string(),
            id: id.into(),
        }
    }

    pub fn folder(id: impl Into<String>) -> Self {
        Self {
            kind: "folder".to_string(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(
        default,
        with = "string_or_i64",
        skip_serializing_if = "Option::is_none"
    )]
    pub project_number: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub lifecycle_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
}

impl Project {
    pub fn is_active(&self) -> bool {
        self.lifecycle_state == LIFECYCLE_ACTIVE
    }
}

/// Project registry operations
#[async_trait]
pub trait ProjectsApi: Send + Sync {
    async fn create_project(&self, project: &Project) -> Result<Operation, ApiError>;

    async fn get_project(&self, project_id: &str) -> Result<Project, ApiError>;

    /// Replaces the whole project object; the API has no partial patch
    async fn update_project(&self, project_id: &str, project: &Project)
        -> Result<Project, ApiError>;

    async fn delete_project(&self, project_id: &str) -> Result<(), ApiError>;

    async fn wait_project_operation(&self, op: Operation, activity: &str) -> Result<(), ApiError>;
}

#[async_trait]
impl ProjectsApi for Client {
    /// POST /projects
    async fn create_project(&self, project: &Project) -> Result<Operation, ApiError> {
        tracing::debug!("creating project {:?}", project.project_id);
        self.post(Service::ResourceManager, "/projects", project)
            .await
    }

    /// GET /projects/{projectId}
    async fn get_project(&self, project_id: &str) -> Result<Project, ApiError> {
        self.get(Service::ResourceManager, &project_path(project_id))
            .await
    }

    /// PUT /projects/{projectId}
    async fn update_project(
        &self,
        project_id: &str,
        project: &Project,
    ) -> Result<Project, ApiError> {
        self.put(Service::ResourceManager, &project_path(project_id), project)
            .await
    }

    /// DELETE /projects/{projectId}
    async fn delete_project(&self, project_id: &str) -> Result<(), ApiError> {
        self.delete::<Empty>(Service::ResourceManager, &project_path(project_id))
            .await
            .map(|_| ())
    }

    /// GET /{operation.name}
    async fn wait_project_operation(&self, op: Operation, activity: &str) -> Result<(), ApiError> {
        self.waiter()
            .wait(op, activity, |name| async move {
                self.get::<Operation>(Service::ResourceManager, &format!("/{}", name))
                    .await
            })
            .await
            .map(|_| ())
    }
}

fn project_path(project_id: &str) -> String {
    format!("/projects/{}", urlencoding::encode(project_id))
}
