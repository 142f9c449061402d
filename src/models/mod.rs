// Core data models for Gantry
// Records come in, timeline tasks go out

pub mod config;
pub mod record;
pub mod roles;
pub mod task;

pub use config::*;
pub use record::*;
pub use roles::*;
pub use task::*;
