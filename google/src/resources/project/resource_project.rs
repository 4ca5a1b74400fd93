//! google_project resource implementation

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, ResourceWithUpgradeState, UpdateResourceRequest,
    UpdateResourceResponse, UpgradeResourceStateRequest, UpgradeResourceStateResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{MapValuesValidator, StringLengthValidator, StringPatternValidator};
use tfplug::{import_state_passthrough_id, ChangeSet, TfplugError};
use tracing::Instrument;

use super::error::ProjectError;
use super::model::ProjectModel;
use super::reconciler::ProjectReconciler;
use crate::GoogleProviderData;

pub const SCHEMA_VERSION: i64 = 1;

static PROJECT_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9-]{4,28}[a-z0-9]$").expect("valid regex")
});

/// Attributes dropped from the schema that old configurations may still set
const REMOVED_ATTRIBUTES: [(&str, &str); 2] = [
    (
        "policy_data",
        "Use the 'google_project_iam_policy' resource to define policies for a Google Project",
    ),
    (
        "policy_etag",
        "Use the 'google_project_iam_policy' resource to define policies for a Google Project",
    ),
];

#[derive(Default)]
pub struct ProjectResource {
    provider_data: Option<GoogleProviderData>,
}

impl ProjectResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_definition() -> Schema {
        SchemaBuilder::new()
            .version(SCHEMA_VERSION)
            .description("Manages a Google Cloud project")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Same as project_id once the project exists")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("project_id", AttributeType::String)
                    .description("The globally unique project ID")
                    .required()
                    .requires_replace()
                    .validator(StringPatternValidator::new(
                        PROJECT_ID_PATTERN.clone(),
                        "6 to 30 lowercase letters, digits or hyphens, starting with a letter and not ending with a hyphen",
                    ))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("The display name of the project")
                    .required()
                    .validator(StringLengthValidator {
                        min: Some(1),
                        max: None,
                    })
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("org_id", AttributeType::String)
                    .description("Numeric ID of the organization this project belongs to")
                    .optional()
                    .computed()
                    .conflicts_with("folder_id")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("folder_id", AttributeType::String)
                    .description("Numeric ID of the folder this project belongs to, with or without the folders/ prefix")
                    .optional()
                    .computed()
                    .conflicts_with("org_id")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("number", AttributeType::String)
                    .description("The numeric identifier of the project")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("billing_account", AttributeType::String)
                    .description("The alphanumeric ID of the billing account to link")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("auto_create_network", AttributeType::Bool)
                    .description("Keep the default network created with the project")
                    .optional()
                    .default(true)
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("skip_delete", AttributeType::Bool)
                    .description("Leave the project in place when the resource is destroyed")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    "labels",
                    AttributeType::Map(Box::new(AttributeType::String)),
                )
                    .description("Key/value labels applied to the project")
                    .optional()
                    .validator(MapValuesValidator {
                        inner: StringLengthValidator {
                            min: None,
                            max: Some(63),
                        },
                    })
                    .build(),
            )
            .build()
    }

    fn reconciler(&self) -> Result<ProjectReconciler, Diagnostic> {
        self.provider_data
            .clone()
            .map(ProjectReconciler::new)
            .ok_or_else(|| {
                Diagnostic::error(
                    "Provider not configured",
                    "Provider data was not properly configured",
                )
            })
    }
}

fn invalid_state(e: TfplugError) -> Diagnostic {
    Diagnostic::error("Invalid project state", e.to_string())
}

fn project_error(e: &ProjectError) -> Diagnostic {
    Diagnostic::error(e.summary(), e.to_string())
}

#[async_trait]
impl Resource for ProjectResource {
    fn type_name(&self) -> &str {
        "google_project"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_definition(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        let mut config = request.config;

        for (name, hint) in REMOVED_ATTRIBUTES {
            if let Some(value) = config.remove(name) {
                if !matches!(value, Dynamic::Null) {
                    diagnostics.push(
                        Diagnostic::error(format!("\"{}\" has been removed", name), hint)
                            .with_attribute(AttributePath::new(name)),
                    );
                }
            }
        }

        diagnostics.extend(Self::schema_definition().validate_config(&config));
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let reconciler = match self.reconciler() {
            Ok(r) => r,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let mut planned = request.planned_state.clone();
        diagnostics.extend(Self::schema_definition().apply_defaults(&mut planned));

        let mut model = match ProjectModel::from_state(&planned) {
            Ok(model) => model,
            Err(e) => {
                diagnostics.push(invalid_state(e));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let result = reconciler
            .create(&mut model)
            .instrument(ctx.span("create"))
            .await;
        if let Err(e) = &result {
            diagnostics.push(project_error(e));
            // Nothing was created, so there is nothing to keep in state
            if model.id.is_none() {
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        }

        let new_state = match model.to_state() {
            Ok(state) => state,
            Err(e) => {
                diagnostics.push(invalid_state(e));
                request.planned_state
            }
        };

        CreateResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let reconciler = match self.reconciler() {
            Ok(r) => r,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        let mut model = match ProjectModel::from_state(&request.current_state) {
            Ok(model) => model,
            Err(e) => {
                diagnostics.push(invalid_state(e));
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        if let Err(e) = reconciler
            .read(&mut model)
            .instrument(ctx.span("read"))
            .await
        {
            diagnostics.push(project_error(&e));
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        }

        if model.id.is_none() {
            return ReadResourceResponse {
                new_state: None,
                diagnostics,
            };
        }

        match model.to_state() {
            Ok(state) => ReadResourceResponse {
                new_state: Some(state),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(invalid_state(e));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let reconciler = match self.reconciler() {
            Ok(r) => r,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        let models = ProjectModel::from_state(&request.prior_state).and_then(|prior| {
            let planned = ProjectModel::from_state(&request.planned_state)?;
            // Compare normalized forms so null and empty do not count as changes
            let changes = ChangeSet::between(&prior.to_state()?, &planned.to_state()?);
            Ok((prior, planned, changes))
        });
        let (mut model, planned, changes) = match models {
            Ok(models) => models,
            Err(e) => {
                diagnostics.push(invalid_state(e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        tracing::debug!(
            "updating project {:?}, changed: {:?}",
            model.id,
            changes.attributes().collect::<Vec<_>>()
        );

        // On failure `model` holds the prior record plus the steps that landed
        if let Err(e) = reconciler
            .update(&mut model, &planned, &changes)
            .instrument(ctx.span("update"))
            .await
        {
            diagnostics.push(project_error(&e));
        }

        let new_state = match model.to_state() {
            Ok(state) => state,
            Err(e) => {
                diagnostics.push(invalid_state(e));
                request.prior_state
            }
        };

        UpdateResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let reconciler = match self.reconciler() {
            Ok(r) => r,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        let mut model = match ProjectModel::from_state(&request.prior_state) {
            Ok(model) => model,
            Err(e) => {
                diagnostics.push(invalid_state(e));
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = reconciler
            .delete(&mut model)
            .instrument(ctx.span("delete"))
            .await
        {
            diagnostics.push(project_error(&e));
        }

        DeleteResourceResponse { diagnostics }
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }

    fn as_upgrade_state(&self) -> Option<&dyn ResourceWithUpgradeState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for ProjectResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];

        if let Some(data) = request.provider_data {
            if let Some(provider_data) = data.downcast_ref::<GoogleProviderData>() {
                self.provider_data = Some(provider_data.clone());
            } else {
                diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract GoogleProviderData from provider data",
                ));
            }
        } else {
            diagnostics.push(Diagnostic::error(
                "No provider data",
                "No provider data was provided to the resource",
            ));
        }

        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for ProjectResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };

        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);

        // The default network flag cannot be read back, assume the default
        for imported in &mut response.imported_resources {
            match ProjectModel::imported(&request.id).to_state() {
                Ok(state) => imported.state = state,
                Err(e) => response.diagnostics.push(invalid_state(e)),
            }
        }

        response
    }
}

#[async_trait]
impl ResourceWithUpgradeState for ProjectResource {
    async fn upgrade_state(
        &self,
        _ctx: Context,
        request: UpgradeResourceStateRequest,
    ) -> UpgradeResourceStateResponse {
        let mut diagnostics = vec![];

        let upgraded = request.raw_state.decode().and_then(|raw| match request.version {
            0 => migrate_v0(raw),
            SCHEMA_VERSION => Ok(raw),
            other => Err(TfplugError::UpgradeFailed(format!(
                "unexpected schema version {} for google_project",
                other
            ))),
        });

        let upgraded_state = match upgraded {
            Ok(state) => state,
            Err(e) => {
                diagnostics.push(Diagnostic::error(
                    "Failed to upgrade project state",
                    e.to_string(),
                ));
                DynamicValue::null()
            }
        };

        UpgradeResourceStateResponse {
            upgraded_state,
            diagnostics,
        }
    }
}

/// Version 0 projects were adopted rather than created, so they keep
/// `skip_delete` set. Flatmap states carry every value as a string.
fn migrate_v0(raw: DynamicValue) -> tfplug::Result<DynamicValue> {
    let Dynamic::Map(mut attrs) = raw.value else {
        return Err(TfplugError::UpgradeFailed(
            "version 0 state is not an object".to_string(),
        ));
    };

    for (removed, _) in REMOVED_ATTRIBUTES {
        attrs.remove(removed);
    }

    // labels.% holds the count, labels.<key> the entries
    let flat_labels: Vec<String> = attrs
        .keys()
        .filter(|k| k.starts_with("labels."))
        .cloned()
        .collect();
    if !flat_labels.is_empty() {
        let mut labels = std::collections::HashMap::new();
        for key in flat_labels {
            let value = attrs.remove(&key);
            if let (Some(label), Some(Dynamic::String(v))) = (key.strip_prefix("labels."), value)
            {
                if label != "%" {
                    labels.insert(label.to_string(), Dynamic::String(v));
                }
            }
        }
        attrs.insert("labels".to_string(), Dynamic::Map(labels));
    }

    for name in ["auto_create_network", "skip_delete"] {
        if let Some(Dynamic::String(flag)) = attrs.get(name) {
            let parsed = flag.parse::<bool>().map_err(|_| {
                TfplugError::UpgradeFailed(format!("invalid {} {:?}", name, flag))
            })?;
            attrs.insert(name.to_string(), Dynamic::Bool(parsed));
        }
    }

    let mut model = ProjectModel::from_state(&DynamicValue::new(Dynamic::Map(attrs)))?;
    if model.project_id.is_empty() {
        model.project_id = model.id.clone().unwrap_or_default();
    }
    model.skip_delete = true;
    model.to_state()
}

#[path = "./resource_project_test.rs"]
mod resource_project_test;
