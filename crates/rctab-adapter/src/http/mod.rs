/*
[INPUT]:  HTTP client configuration and accounting API endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod accounting;
pub mod client;
pub mod error;

pub use client::{ClientConfig, RctabClient};
pub use error::{RctabError, Result};
