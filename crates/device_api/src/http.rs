mod device_handler;
mod device_json;
mod router;

pub use device_handler::*;
pub use device_json::*;
pub use router::*;
