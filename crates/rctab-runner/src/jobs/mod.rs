/*
[INPUT]:  Settings and adapter clients
[OUTPUT]: One module per scheduled collection job
[POS]:    Jobs layer - module wiring
[UPDATE]: When adding new jobs
*/

pub mod controller;
pub mod cost;
pub mod monthly;
pub mod status;
pub mod usage;
