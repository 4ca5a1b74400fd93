pub mod auth;
pub mod billing;
pub mod client;
pub mod common;
pub mod compute;
pub mod error;
pub mod operation;
pub mod projects;
pub mod serviceusage;
pub mod transport;

pub use auth::{AdcTokenSource, StaticToken, TokenSource};
pub use billing::{BillingApi, ProjectBillingInfo};
pub use client::{Client, Endpoints, RetryConfig, Service};
pub use common::Operation;
pub use compute::{ComputeApi, ComputeOperation, Firewall, FirewallList};
pub use error::ApiError;
pub use operation::OperationWaiter;
pub use projects::{Project, ProjectsApi, ResourceId};
pub use serviceusage::ServiceUsageApi;
