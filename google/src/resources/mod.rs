//! Resource implementations

pub mod project;

pub use project::ProjectResource;
