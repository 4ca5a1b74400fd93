//! tfplug - Terraform Plugin Framework for Rust
//!
//! The provider-side contract for building Terraform providers in Rust:
//! dynamic values, schemas, diagnostics and the async resource/provider
//! traits. Transport is left to the embedding binary.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod provider;
pub mod resource;

// Helper modules
pub mod change_set;
pub mod import;
pub mod logging;
pub mod validator;

// Re-exports for convenience
pub use change_set::ChangeSet;
pub use context::Context;
pub use error::{Result, TfplugError};
pub use import::import_state_passthrough_id;
pub use provider::{Provider, ResourceFactory};
pub use resource::{
    Resource, ResourceWithConfigure, ResourceWithImportState, ResourceWithUpgradeState,
};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use types::{AttributePath, Diagnostic, DiagnosticSeverity, Dynamic, DynamicValue};
