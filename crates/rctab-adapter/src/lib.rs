/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public RCTab adapter crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod azure;
pub mod http;
pub mod types;

// Re-export commonly used types from auth
pub use auth::{ACCESS_TOKEN_EXPIRE_MINUTES, ApiAuth, TokenClaims};

// Re-export commonly used types from http
pub use http::{ClientConfig, RctabClient, RctabError, Result};

// Re-export commonly used types from the azure layer
pub use azure::{
    AzureClient,
    AzureCredentials,
    AzureRoleAssignment,
    AzureSubscription,
    CostRow,
    DirectoryObject,
    UsageDetail,
    UsageScope,
};

// Re-export all wire types
pub use types::*;
