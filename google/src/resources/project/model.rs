//! In-memory record of a `google_project` and its state encoding

use std::collections::BTreeMap;
use tfplug::types::{AttributePath, DynamicValue};
use tfplug::Result;

use super::error::ProjectError;
use crate::api::billing::BILLING_ACCOUNT_PREFIX;
use crate::api::{Project, ResourceId};

const FOLDER_PREFIX: &str = "folders/";

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectModel {
    /// `None` once the project is gone; the host drops the resource
    pub id: Option<String>,
    pub project_id: String,
    pub name: String,
    pub org_id: String,
    pub folder_id: String,
    /// Decimal project number assigned by the API
    pub number: String,
    /// Empty when no billing account is linked
    pub billing_account: String,
    pub auto_create_network: bool,
    pub skip_delete: bool,
    pub labels: BTreeMap<String, String>,
}

impl Default for ProjectModel {
    fn default() -> Self {
        Self {
            id: None,
            project_id: String::new(),
            name: String::new(),
            org_id: String::new(),
            folder_id: String::new(),
            number: String::new(),
            billing_account: String::new(),
            auto_create_network: true,
            skip_delete: false,
            labels: BTreeMap::new(),
        }
    }
}

impl ProjectModel {
    /// Minimal record for `terraform import`; the follow-up read fills the rest
    pub fn imported(project_id: &str) -> Self {
        Self {
            id: Some(project_id.to_string()),
            project_id: project_id.to_string(),
            ..Default::default()
        }
    }

    pub fn from_state(state: &DynamicValue) -> Result<Self> {
        let string = |name: &str| -> Result<String> {
            Ok(state
                .get_optional_string(&AttributePath::new(name))?
                .unwrap_or_default())
        };

        let defaults = Self::default();
        Ok(Self {
            id: state
                .get_optional_string(&AttributePath::new("id"))?
                .filter(|id| !id.is_empty()),
            project_id: string("project_id")?,
            name: string("name")?,
            org_id: string("org_id")?,
            folder_id: parse_folder_id(&string("folder_id")?).to_string(),
            number: string("number")?,
            billing_account: string("billing_account")?,
            auto_create_network: state
                .get_optional_bool(&AttributePath::new("auto_create_network"))?
                .unwrap_or(defaults.auto_create_network),
            skip_delete: state
                .get_optional_bool(&AttributePath::new("skip_delete"))?
                .unwrap_or(defaults.skip_delete),
            labels: state
                .get_string_map(&AttributePath::new("labels"))?
                .into_iter()
                .collect(),
        })
    }

    /// Empty strings and an empty label map are written as null so they
    /// compare equal to unset configuration
    pub fn to_state(&self) -> Result<DynamicValue> {
        let mut state = DynamicValue::object();

        let mut put = |name: &str, value: &str| {
            let path = AttributePath::new(name);
            if value.is_empty() {
                state.set_null(&path)
            } else {
                state.set_string(&path, value.to_string())
            }
        };
        put("id", self.id.as_deref().unwrap_or_default())?;
        put("project_id", &self.project_id)?;
        put("name", &self.name)?;
        put("org_id", &self.org_id)?;
        put("folder_id", &self.folder_id)?;
        put("number", &self.number)?;
        put("billing_account", &self.billing_account)?;

        state.set_bool(
            &AttributePath::new("auto_create_network"),
            self.auto_create_network,
        )?;
        state.set_bool(&AttributePath::new("skip_delete"), self.skip_delete)?;

        let labels = AttributePath::new("labels");
        if self.labels.is_empty() {
            state.set_null(&labels)?;
        } else {
            state.set_string_map(&labels, self.labels.clone())?;
        }

        Ok(state)
    }

    /// Organization wins when both are set; the schema keeps them exclusive
    pub fn parent(&self) -> Option<ResourceId> {
        if !self.org_id.is_empty() {
            Some(ResourceId::organization(&self.org_id))
        } else if !self.folder_id.is_empty() {
            Some(ResourceId::folder(parse_folder_id(&self.folder_id)))
        } else {
            None
        }
    }

    /// Body for the create call
    pub fn to_remote(&self) -> Project {
        Project {
            project_id: self.project_id.clone(),
            name: self.name.clone(),
            labels: self.labels.clone(),
            parent: self.parent(),
            ..Default::default()
        }
    }

    /// Copies everything the API reports. Billing and the create-time flags
    /// are left alone.
    pub fn apply_project(&mut self, project: &Project) {
        self.project_id = project.project_id.clone();
        self.number = project
            .project_number
            .map(|n| n.to_string())
            .unwrap_or_default();
        self.name = project.name.clone();
        self.labels = project.labels.clone();

        match project.parent.as_ref().map(|p| (p.kind.as_str(), p)) {
            Some(("organization", parent)) => {
                self.org_id = parent.id.clone();
                self.folder_id.clear();
            }
            Some(("folder", parent)) => {
                self.folder_id = parent.id.clone();
                self.org_id.clear();
            }
            _ => {}
        }
    }
}

/// Strips a leading `folders/` so both spellings name the same folder
pub fn parse_folder_id(value: &str) -> &str {
    value.strip_prefix(FOLDER_PREFIX).unwrap_or(value)
}

/// Billing account id from the API's `billingAccounts/{id}` name. A missing
/// or empty name means no account is linked.
pub fn parse_billing_account(
    project_id: &str,
    name: Option<&str>,
) -> std::result::Result<String, ProjectError> {
    match name.filter(|n| !n.is_empty()) {
        None => Ok(String::new()),
        Some(name) => name
            .strip_prefix(BILLING_ACCOUNT_PREFIX)
            .map(str::to_string)
            .ok_or_else(|| ProjectError::BillingParse {
                project_id: project_id.to_string(),
                value: name.to_string(),
            }),
    }
}
