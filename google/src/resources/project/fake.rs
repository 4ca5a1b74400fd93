//! In-memory stand-in for the four Google services

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::api::common::Operation;
use crate::api::compute::{ComputeApi, ComputeOperation, FirewallList};
use crate::api::projects::LIFECYCLE_ACTIVE;
use crate::api::{ApiError, BillingApi, Project, ProjectBillingInfo, ProjectsApi, ServiceUsageApi};
use crate::provider_data::{GoogleProviderData, ReconcileOptions};

#[derive(Debug, Default)]
pub struct FakeState {
    pub projects: BTreeMap<String, Project>,
    /// Billing account name as the API reports it, keyed by project
    pub billing: BTreeMap<String, String>,
    /// Served in order; page `n` is requested with token `page-n`
    pub firewall_pages: Vec<FirewallList>,
    /// Every call in order, as `method:args`
    pub calls: Vec<String>,
    pub billing_requests: Vec<ProjectBillingInfo>,
    pub project_updates: Vec<Project>,
    /// Methods that answer with a 500
    pub failing: HashSet<&'static str>,
    /// Billing updates are acknowledged but never show up on reads
    pub billing_never_applies: bool,
    /// Reads that still see the old billing value after an update
    pub billing_lag: u32,
    pending_billing: Option<(String, String)>,
}

#[derive(Debug, Default)]
pub struct FakeGoogle {
    state: Mutex<FakeState>,
}

impl FakeGoogle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.split(':').next() == Some(method))
            .count()
    }

    pub fn insert_project(&self, project: Project) {
        self.state()
            .projects
            .insert(project.project_id.clone(), project);
    }

    pub fn fail(&self, method: &'static str) {
        self.state().failing.insert(method);
    }

    fn record(&self, method: &'static str, args: &[&str]) -> Result<(), ApiError> {
        let mut state = self.state();
        let mut call = method.to_string();
        for arg in args {
            call.push(':');
            call.push_str(arg);
        }
        state.calls.push(call);
        if state.failing.contains(method) {
            return Err(ApiError::ApiError {
                status: 500,
                message: format!("{} failed", method),
                details: None,
            });
        }
        Ok(())
    }
}

pub fn active_project(project_id: &str, name: &str) -> Project {
    Project {
        project_id: project_id.to_string(),
        name: name.to_string(),
        project_number: Some(1234567890),
        lifecycle_state: LIFECYCLE_ACTIVE.to_string(),
        ..Default::default()
    }
}

pub fn provider_data(fake: &Arc<FakeGoogle>) -> GoogleProviderData {
    GoogleProviderData {
        projects: fake.clone(),
        billing: fake.clone(),
        compute: fake.clone(),
        service_usage: fake.clone(),
        options: ReconcileOptions {
            billing_poll_attempts: 3,
            billing_poll_interval: Duration::ZERO,
        },
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::ApiError {
        status: 404,
        message: format!("{} was not found", what),
        details: None,
    }
}

fn done_compute_op(name: &str) -> ComputeOperation {
    ComputeOperation {
        name: name.to_string(),
        status: "DONE".to_string(),
        ..Default::default()
    }
}

#[async_trait]
impl ProjectsApi for FakeGoogle {
    async fn create_project(&self, project: &Project) -> Result<Operation, ApiError> {
        self.record("create_project", &[&project.project_id])?;
        let mut created = project.clone();
        created.project_number = Some(1234567890);
        created.lifecycle_state = LIFECYCLE_ACTIVE.to_string();
        self.state()
            .projects
            .insert(project.project_id.clone(), created);
        Ok(Operation {
            name: format!("operations/cp.{}", project.project_id),
            ..Default::default()
        })
    }

    async fn get_project(&self, project_id: &str) -> Result<Project, ApiError> {
        self.record("get_project", &[project_id])?;
        self.state()
            .projects
            .get(project_id)
            .cloned()
            .ok_or_else(|| not_found(project_id))
    }

    async fn update_project(
        &self,
        project_id: &str,
        project: &Project,
    ) -> Result<Project, ApiError> {
        self.record("update_project", &[project_id])?;
        let mut state = self.state();
        state.project_updates.push(project.clone());
        state
            .projects
            .insert(project_id.to_string(), project.clone());
        Ok(project.clone())
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), ApiError> {
        self.record("delete_project", &[project_id])?;
        if let Some(project) = self.state().projects.get_mut(project_id) {
            project.lifecycle_state = "DELETE_REQUESTED".to_string();
        }
        Ok(())
    }

    async fn wait_project_operation(&self, op: Operation, activity: &str) -> Result<(), ApiError> {
        self.record("wait_project_operation", &[&op.name, activity])
    }
}

#[async_trait]
impl BillingApi for FakeGoogle {
    async fn get_billing_info(&self, project_id: &str) -> Result<ProjectBillingInfo, ApiError> {
        self.record("get_billing_info", &[project_id])?;
        let mut state = self.state();

        if let Some((pending_project, name)) = state.pending_billing.clone() {
            if pending_project == project_id {
                if state.billing_lag == 0 {
                    state.billing.insert(pending_project, name);
                    state.pending_billing = None;
                } else {
                    state.billing_lag -= 1;
                }
            }
        }

        Ok(ProjectBillingInfo {
            billing_account_name: state.billing.get(project_id).cloned(),
            billing_enabled: None,
        })
    }

    async fn update_billing_info(
        &self,
        project_id: &str,
        info: &ProjectBillingInfo,
    ) -> Result<ProjectBillingInfo, ApiError> {
        self.record("update_billing_info", &[project_id])?;
        let mut state = self.state();
        state.billing_requests.push(info.clone());
        if !state.billing_never_applies {
            let name = info.billing_account_name.clone().unwrap_or_default();
            state.pending_billing = Some((project_id.to_string(), name));
        }
        Ok(info.clone())
    }
}

#[async_trait]
impl ComputeApi for FakeGoogle {
    async fn list_firewalls(
        &self,
        project_id: &str,
        filter: &str,
        page_token: Option<&str>,
    ) -> Result<FirewallList, ApiError> {
        self.record(
            "list_firewalls",
            &[project_id, filter, page_token.unwrap_or("")],
        )?;
        let index = match page_token {
            None => 0,
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| ApiError::ParseError(format!("bad page token {}", token)))?,
        };
        Ok(self
            .state()
            .firewall_pages
            .get(index)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_firewall(
        &self,
        project_id: &str,
        firewall: &str,
    ) -> Result<ComputeOperation, ApiError> {
        self.record("delete_firewall", &[project_id, firewall])?;
        Ok(done_compute_op(&format!("delete-{}", firewall)))
    }

    async fn delete_network(
        &self,
        project_id: &str,
        network: &str,
    ) -> Result<ComputeOperation, ApiError> {
        self.record("delete_network", &[project_id, network])?;
        Ok(done_compute_op(&format!("delete-{}", network)))
    }

    async fn wait_compute_operation(
        &self,
        project_id: &str,
        op: ComputeOperation,
        activity: &str,
    ) -> Result<(), ApiError> {
        self.record("wait_compute_operation", &[project_id, &op.name, activity])
    }
}

#[async_trait]
impl ServiceUsageApi for FakeGoogle {
    async fn enable_service(&self, project_id: &str, service: &str) -> Result<Operation, ApiError> {
        self.record("enable_service", &[project_id, service])?;
        Ok(Operation {
            name: format!("operations/acf.{}", project_id),
            ..Default::default()
        })
    }

    async fn wait_service_operation(&self, op: Operation, activity: &str) -> Result<(), ApiError> {
        self.record("wait_service_operation", &[&op.name, activity])
    }
}
