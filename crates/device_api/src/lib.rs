pub mod device_api;
pub mod http;

pub use device_api::*;
pub use http::*;
