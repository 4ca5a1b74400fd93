pub mod api;
pub mod config;
pub mod provider_data;
pub mod resources;

pub use provider_data::{GoogleProviderData, ReconcileOptions};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, Provider, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse, ResourceFactory,
    ValidateProviderConfigRequest, ValidateProviderConfigResponse,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::types::Diagnostic;

use config::ProviderConfig;
use resources::ProjectResource;

pub struct GoogleProvider {
    provider_data: Option<Arc<GoogleProviderData>>,
    options: ReconcileOptions,
}

impl Default for GoogleProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleProvider {
    pub fn new() -> Self {
        Self {
            provider_data: None,
            options: ReconcileOptions::default(),
        }
    }

    /// Overrides the billing poll cadence handed to resources
    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn provider_data(&self) -> Option<Arc<GoogleProviderData>> {
        self.provider_data.clone()
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn type_name(&self) -> &str {
        "google"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: ProviderConfig::schema(),
            diagnostics: vec![],
        }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        // A subscriber installed by the embedding binary wins
        if let Err(e) = tfplug::logging::init() {
            tracing::debug!("logging already initialised: {}", e);
        }

        let config = match ProviderConfig::resolve(&request.config) {
            Ok(config) => config,
            Err(diagnostics) => {
                return ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        };

        tracing::info!(
            "configuring google provider (terraform {})",
            request.terraform_version
        );

        let client = match config.token_source().await {
            Ok(token_source) => config.client(token_source),
            Err(e) => Err(e),
        };
        let client = match client {
            Ok(client) => client,
            Err(e) => {
                return ConfigureProviderResponse {
                    diagnostics: vec![Diagnostic::error(
                        "Failed to create API client",
                        e.to_string(),
                    )],
                    provider_data: None,
                }
            }
        };

        let data = Arc::new(GoogleProviderData::new(client).with_options(self.options.clone()));
        self.provider_data = Some(data.clone());

        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(data),
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut diagnostics = ProviderConfig::schema().validate_config(&request.config);
        if let Err(errors) = ProviderConfig::resolve(&request.config) {
            diagnostics.extend(errors);
        }
        ValidateProviderConfigResponse { diagnostics }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut resources: HashMap<String, ResourceFactory> = HashMap::new();
        resources.insert(
            "google_project".to_string(),
            Box::new(|| Box::new(ProjectResource::new()) as Box<dyn ResourceWithConfigure>),
        );
        resources
    }
}
