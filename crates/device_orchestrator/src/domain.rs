mod best_effort;
mod device_identity;
mod device_orchestration_service;
mod device_orchestrator_config;
mod routing_config;

pub use best_effort::*;
pub use device_identity::*;
pub use device_orchestration_service::*;
pub use device_orchestrator_config::*;
pub use routing_config::*;
