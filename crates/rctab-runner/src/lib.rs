/*
[INPUT]:  Crate modules for settings, scheduling and jobs
[OUTPUT]: Public runner crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod jobs;
pub mod scheduler;
pub mod settings;

pub use settings::Settings;
