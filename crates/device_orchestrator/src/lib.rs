pub mod device_orchestrator;
pub mod domain;

pub use domain::*;
