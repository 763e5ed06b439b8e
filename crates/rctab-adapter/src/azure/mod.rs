/*
[INPUT]:  Azure credentials and management-plane endpoints
[OUTPUT]: Typed results from ARM and Microsoft Graph
[POS]:    Azure layer - management-plane REST communication
[UPDATE]: When adding new Azure resource endpoints
*/

pub mod authorization;
pub mod client;
pub mod consumption;
pub mod cost;
pub mod graph;
pub mod subscriptions;
pub mod token;

pub use authorization::AzureRoleAssignment;
pub use client::AzureClient;
pub use consumption::{UsageDetail, UsageDetailProperties, UsageScope};
pub use cost::CostRow;
pub use graph::DirectoryObject;
pub use subscriptions::AzureSubscription;
pub use token::AzureCredentials;
