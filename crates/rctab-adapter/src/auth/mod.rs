/*
[INPUT]:  Signing key material and identity configuration
[OUTPUT]: Bearer-token authentication for the accounting API
[POS]:    Auth layer - module wiring
[UPDATE]: When adding new authentication schemes
*/

pub mod bearer;

pub use bearer::{ACCESS_TOKEN_EXPIRE_MINUTES, ApiAuth, TokenClaims};
