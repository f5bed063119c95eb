mod container_runtime;
mod device;
mod result;
mod stream_provisioner;

pub use container_runtime::*;
pub use device::*;
pub use result::*;
pub use stream_provisioner::*;
