//! Cloud Billing v1 project billing info

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::{Client, Service};
use super::error::ApiError;

pub const BILLING_ACCOUNT_PREFIX: &str = "billingAccounts/";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBillingInfo {
    /// `billingAccounts/{id}`; absent when no account is linked.
    /// Sending it empty is not the same as omitting it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_enabled: Option<bool>,
}

impl ProjectBillingInfo {
    /// Request body linking `account`, or unlinking when it is empty
    pub fn for_account(account: &str) -> Self {
        Self {
            billing_account_name: (!account.is_empty())
                .then(|| format!("{}{}", BILLING_ACCOUNT_PREFIX, account)),
            billing_enabled: None,
        }
    }
}

/// Project to billing account linkage
#[async_trait]
pub trait BillingApi: Send + Sync {
    async fn get_billing_info(&self, project_id: &str) -> Result<ProjectBillingInfo, ApiError>;

    async fn update_billing_info(
        &self,
        project_id: &str,
        info: &ProjectBillingInfo,
    ) -> Result<ProjectBillingInfo, ApiError>;
}

#[async_trait]
impl BillingApi for Client {
    /// GET /projects/{projectId}/billingInfo
    async fn get_billing_info(&self, project_id: &str) -> Result<ProjectBillingInfo, ApiError> {
        self.get(Service::Billing, &billing_info_path(project_id))
            .await
    }

    /// PUT /projects/{projectId}/billingInfo
    async fn update_billing_info(
        &self,
        project_id: &str,
        info: &ProjectBillingInfo,
    ) -> Result<ProjectBillingInfo, ApiError> {
        self.put(Service::Billing, &billing_info_path(project_id), info)
            .await
    }
}

fn billing_info_path(project_id: &str) -> String {
    format!("/projects/{}/billingInfo", urlencoding::encode(project_id))
}
