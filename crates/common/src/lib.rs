pub mod docker;
pub mod domain;
pub mod http;
pub mod nats;
pub mod postgres;
pub mod telemetry;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockContainerRuntime;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockDeviceRepository;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockStreamProvisioner;
#[cfg(any(test, feature = "testing"))]
pub use nats::MockJetStreamAdmin;
