pub mod error;
pub mod model;
pub mod reconciler;
pub mod resource_project;

#[cfg(test)]
pub(crate) mod fake;

pub use error::ProjectError;
pub use model::ProjectModel;
pub use reconciler::ProjectReconciler;
pub use resource_project::ProjectResource;
