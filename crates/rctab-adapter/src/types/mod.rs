/*
[INPUT]:  Module organization requirements
[OUTPUT]: Public type exports for the crate
[POS]:    Data layer - module wiring
[UPDATE]: When adding new type modules
*/

pub mod enums;
pub mod models;

pub use enums::{Currency, SubscriptionState};
pub use models::{
    AllCMUsage,
    AllSubscriptionStatus,
    AllUsage,
    Budget,
    CMUsage,
    DesiredState,
    RoleAssignment,
    SubscriptionStatus,
    Usage,
};
