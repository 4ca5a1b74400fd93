//! Provider trait and related types
//!
//! A provider resolves its own configuration once, then hands shared data
//! (API clients, credentials) to every resource it creates through
//! [`ConfigureProviderResponse::provider_data`].

use crate::context::Context;
use crate::resource::{ConfigureResourceRequest, ResourceWithConfigure};
use crate::schema::Schema;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory function for creating resources
pub type ResourceFactory = Box<dyn Fn() -> Box<dyn ResourceWithConfigure> + Send + Sync>;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider type name, the prefix of every resource type name
    fn type_name(&self) -> &str;

    async fn metadata(
        &self,
        ctx: Context,
        request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse;

    async fn schema(&self, ctx: Context, request: ProviderSchemaRequest) -> ProviderSchemaResponse;

    /// Called once before any resource operation
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    async fn validate(
        &self,
        ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse;

    /// Resource factories keyed by resource type name
    fn resources(&self) -> HashMap<String, ResourceFactory>;
}

pub struct ProviderMetadataRequest;

pub struct ProviderMetadataResponse {
    pub type_name: String,
}

pub struct ProviderSchemaRequest;

pub struct ProviderSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
    /// Passed to every resource's configure method
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

pub struct ValidateProviderConfigRequest {
    pub config: DynamicValue,
}

pub struct ValidateProviderConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds the named resource and configures it with the provider's data.
/// Returns the configure diagnostics alongside the resource.
pub async fn instantiate_resource(
    ctx: Context,
    factories: &HashMap<String, ResourceFactory>,
    type_name: &str,
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> (Option<Box<dyn ResourceWithConfigure>>, Vec<Diagnostic>) {
    let Some(factory) = factories.get(type_name) else {
        return (
            None,
            vec![Diagnostic::error(
                "Unknown resource type",
                format!("The provider does not support resource type {}", type_name),
            )],
        );
    };

    let mut resource = factory();
    let response = resource
        .configure(ctx, ConfigureResourceRequest { provider_data })
        .await;
    (Some(resource), response.diagnostics)
}
