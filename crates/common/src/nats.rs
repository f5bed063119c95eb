mod client;
mod stream_provisioner;
mod traits;

pub use client::*;
pub use stream_provisioner::*;
pub use traits::*;
