//! Remote choreography behind the `google_project` lifecycle
//!
//! Every step runs sequentially and the first failure aborts the rest.
//! Nothing already applied is rolled back.

use futures::TryStreamExt;
use tfplug::ChangeSet;

use super::error::ProjectError;
use super::model::{parse_billing_account, ProjectModel};
use crate::api::compute::{firewall_pages, network_self_link};
use crate::api::serviceusage::COMPUTE_SERVICE;
use crate::api::{Project, ProjectBillingInfo};
use crate::provider_data::GoogleProviderData;

const DEFAULT_NETWORK: &str = "default";

pub struct ProjectReconciler {
    data: GoogleProviderData,
}

impl ProjectReconciler {
    pub fn new(data: GoogleProviderData) -> Self {
        Self { data }
    }

    pub async fn create(&self, model: &mut ProjectModel) -> Result<(), ProjectError> {
        let request = model.to_remote();
        tracing::debug!("Creating new project {:?}", request.project_id);

        let op = self
            .data
            .projects
            .create_project(&request)
            .await
            .map_err(|source| ProjectError::Create {
                project_id: request.project_id.clone(),
                name: request.name.clone(),
                source,
            })?;

        // Set before waiting so a failed wait still leaves something to import
        model.id = Some(request.project_id.clone());

        if let Err(e) = self
            .data
            .projects
            .wait_project_operation(op, "project to create")
            .await
        {
            model.id = None;
            return Err(ProjectError::CreateWait(e));
        }

        if !model.billing_account.is_empty() {
            self.update_billing_account(model).await?;
        }

        self.read(model).await?;

        if !model.auto_create_network {
            self.enable_compute(&request.project_id).await?;
            self.force_delete_network(&request.project_id, DEFAULT_NETWORK)
                .await
                .map_err(|source| ProjectError::DefaultNetwork {
                    project_id: request.project_id.clone(),
                    source: Box::new(source),
                })?;
        }

        Ok(())
    }

    /// Refreshes `model` from the API. A project that is gone or no longer
    /// `ACTIVE` clears `model.id` and is not an error.
    pub async fn read(&self, model: &mut ProjectModel) -> Result<(), ProjectError> {
        let Some(id) = model.id.clone() else {
            return Ok(());
        };

        let project = match self.data.projects.get_project(&id).await {
            Ok(project) => project,
            Err(e) if e.is_not_found() => {
                tracing::warn!("Removing Project {:?} because it's gone", id);
                model.id = None;
                return Ok(());
            }
            Err(source) => {
                return Err(ProjectError::Read {
                    project_id: id,
                    source,
                })
            }
        };

        if !project.is_active() {
            tracing::warn!(
                "Removing project '{}' because its state is '{}' (requires 'ACTIVE').",
                id,
                project.lifecycle_state
            );
            model.id = None;
            return Ok(());
        }

        model.apply_project(&project);

        let info = self
            .data
            .billing
            .get_billing_info(&id)
            .await
            .map_err(|source| ProjectError::ReadBilling {
                project_id: id.clone(),
                source,
            })?;
        model.billing_account =
            parse_billing_account(&id, info.billing_account_name.as_deref())?;

        Ok(())
    }

    /// Applies the changed attributes of `desired` one full-object update at
    /// a time, in the order name, parent, billing, labels. `record` starts
    /// as the prior state and takes in each step as it lands remotely, so on
    /// failure it still describes what the API holds.
    pub async fn update(
        &self,
        record: &mut ProjectModel,
        desired: &ProjectModel,
        changes: &ChangeSet,
    ) -> Result<(), ProjectError> {
        let id = record.id.clone().ok_or(ProjectError::MissingId)?;

        let mut project = match self.data.projects.get_project(&id).await {
            Ok(project) => project,
            Err(e) if e.is_not_found() => return Err(ProjectError::NotFound(id)),
            Err(source) => {
                return Err(ProjectError::Check {
                    project_id: id,
                    source,
                })
            }
        };

        if changes.has_change("name") {
            project.name = desired.name.clone();
            project = self.put_project(&id, desired, &project).await?;
            record.apply_project(&project);
        }

        if changes.has_change("org_id") || changes.has_change("folder_id") {
            // No parent in config leaves the current one in place
            if let Some(parent) = desired.parent() {
                project.parent = Some(parent);
                project = self.put_project(&id, desired, &project).await?;
                record.apply_project(&project);
            }
        }

        if changes.has_change("billing_account") {
            record.billing_account = desired.billing_account.clone();
            self.update_billing_account(record).await?;
        }

        if changes.has_change("labels") {
            project.labels = desired.labels.clone();
            project = self.put_project(&id, desired, &project).await?;
        }

        record.apply_project(&project);
        record.auto_create_network = desired.auto_create_network;
        record.skip_delete = desired.skip_delete;
        Ok(())
    }

    pub async fn delete(&self, model: &mut ProjectModel) -> Result<(), ProjectError> {
        if model.skip_delete {
            tracing::debug!("skip_delete set, leaving project {:?} in place", model.id);
            model.id = None;
            return Ok(());
        }

        let id = model.id.clone().ok_or(ProjectError::MissingId)?;
        self.data
            .projects
            .delete_project(&id)
            .await
            .map_err(|source| ProjectError::Delete {
                project_id: id,
                source,
            })?;

        model.id = None;
        Ok(())
    }

    /// Links `model.billing_account`, or unlinks when it is empty, then
    /// re-reads until the API reports the new linkage. On timeout the record
    /// keeps whatever was observed last.
    pub async fn update_billing_account(
        &self,
        model: &mut ProjectModel,
    ) -> Result<(), ProjectError> {
        let id = model
            .id
            .clone()
            .unwrap_or_else(|| model.project_id.clone());
        let desired = model.billing_account.clone();

        if let Err(source) = self
            .data
            .billing
            .update_billing_info(&id, &ProjectBillingInfo::for_account(&desired))
            .await
        {
            model.billing_account.clear();
            return Err(ProjectError::SetBilling {
                project_id: id,
                account: desired,
                source,
            });
        }

        let attempts = self.data.options.billing_poll_attempts.max(1);
        for attempt in 1..=attempts {
            self.read(model).await?;
            if model.billing_account == desired {
                return Ok(());
            }
            if attempt < attempts {
                tokio::time::sleep(self.data.options.billing_poll_interval).await;
            }
        }

        Err(ProjectError::BillingTimeout {
            desired,
            observed: model.billing_account.clone(),
        })
    }

    /// Deletes every firewall rule attached to `network`, then the network
    pub async fn force_delete_network(
        &self,
        project_id: &str,
        network: &str,
    ) -> Result<(), ProjectError> {
        let compute = self.data.compute.as_ref();
        let filter = format!("network eq {}", network_self_link(project_id, network));

        let mut pages = std::pin::pin!(firewall_pages(compute, project_id, &filter));
        while let Some(page) =
            pages
                .try_next()
                .await
                .map_err(|source| ProjectError::ListFirewalls {
                    project_id: project_id.to_string(),
                    source,
                })?
        {
            tracing::debug!("Found {} firewall rules in {:?} network", page.len(), network);
            for firewall in page {
                let op = compute
                    .delete_firewall(project_id, &firewall.name)
                    .await
                    .map_err(|source| ProjectError::DeleteFirewall {
                        firewall: firewall.name.clone(),
                        source,
                    })?;
                compute
                    .wait_compute_operation(project_id, op, "Deleting Firewall")
                    .await
                    .map_err(|source| ProjectError::DeleteFirewall {
                        firewall: firewall.name.clone(),
                        source,
                    })?;
            }
        }

        let delete_network_err = |source| ProjectError::DeleteNetwork {
            network: network.to_string(),
            source,
        };
        let op = compute
            .delete_network(project_id, network)
            .await
            .map_err(delete_network_err)?;
        compute
            .wait_compute_operation(project_id, op, "Deleting Network")
            .await
            .map_err(delete_network_err)
    }

    async fn enable_compute(&self, project_id: &str) -> Result<(), ProjectError> {
        let service_usage = self.data.service_usage.as_ref();
        let op = service_usage
            .enable_service(project_id, COMPUTE_SERVICE)
            .await
            .map_err(ProjectError::EnableCompute)?;
        service_usage
            .wait_service_operation(op, "api to enable")
            .await
            .map_err(ProjectError::EnableCompute)
    }

    async fn put_project(
        &self,
        id: &str,
        desired: &ProjectModel,
        project: &Project,
    ) -> Result<Project, ProjectError> {
        self.data
            .projects
            .update_project(id, project)
            .await
            .map_err(|source| ProjectError::Update {
                name: desired.name.clone(),
                source,
            })
    }
}

#[path = "./reconciler_test.rs"]
mod reconciler_test;
