use crate::api::ApiError;
use thiserror::Error;

/// Failure of one reconciliation step, carrying which project and which
/// remote call was involved
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Error creating project {project_id} ({name}): {source}")]
    Create {
        project_id: String,
        name: String,
        #[source]
        source: ApiError,
    },

    #[error("{0}")]
    CreateWait(#[source] ApiError),

    #[error("Error reading project {project_id:?}: {source}")]
    Read {
        project_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Error reading billing account for project \"projects/{project_id}\": {source}")]
    ReadBilling {
        project_id: String,
        #[source]
        source: ApiError,
    },

    #[error(
        "Error parsing billing account for project \"projects/{project_id}\". Expected value to begin with 'billingAccounts/' but got {value}"
    )]
    BillingParse { project_id: String, value: String },

    #[error("Error setting billing account {account:?} for project \"projects/{project_id}\": {source}")]
    SetBilling {
        project_id: String,
        account: String,
        #[source]
        source: ApiError,
    },

    #[error(
        "Timed out waiting for billing account to return correct value. Waiting for {desired}, got {observed}."
    )]
    BillingTimeout { desired: String, observed: String },

    #[error("Error enabling the Compute Engine API required to delete the default network: {0}")]
    EnableCompute(#[source] ApiError),

    #[error("Error deleting default network in project {project_id}: {source}")]
    DefaultNetwork {
        project_id: String,
        #[source]
        source: Box<ProjectError>,
    },

    #[error("Error listing firewall rules in project {project_id}: {source}")]
    ListFirewalls {
        project_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Error deleting firewall {firewall}: {source}")]
    DeleteFirewall {
        firewall: String,
        #[source]
        source: ApiError,
    },

    #[error("Error deleting network {network}: {source}")]
    DeleteNetwork {
        network: String,
        #[source]
        source: ApiError,
    },

    #[error("Project {0:?} does not exist.")]
    NotFound(String),

    #[error("Error checking project {project_id:?}: {source}")]
    Check {
        project_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Error updating project {name:?}: {source}")]
    Update {
        name: String,
        #[source]
        source: ApiError,
    },

    #[error("Error deleting project {project_id:?}: {source}")]
    Delete {
        project_id: String,
        #[source]
        source: ApiError,
    },

    #[error("Project has no id in state")]
    MissingId,
}

impl ProjectError {
    /// Diagnostic summary naming the lifecycle step that failed
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Create { .. }
            | Self::CreateWait(_)
            | Self::EnableCompute(_)
            | Self::DefaultNetwork { .. }
            | Self::ListFirewalls { .. }
            | Self::DeleteFirewall { .. }
            | Self::DeleteNetwork { .. } => "Failed to create project",
            Self::Read { .. } | Self::ReadBilling { .. } | Self::BillingParse { .. } => {
                "Failed to read project"
            }
            Self::SetBilling { .. } | Self::BillingTimeout { .. } => {
                "Failed to set billing account"
            }
            Self::NotFound(_) | Self::Check { .. } | Self::Update { .. } | Self::MissingId => {
                "Failed to update project"
            }
            Self::Delete { .. } => "Failed to delete project",
        }
    }
}
