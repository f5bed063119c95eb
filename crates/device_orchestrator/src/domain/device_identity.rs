use base32::Alphabet;
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};

/// Random bytes behind every device identifier (128 bits)
pub const IDENTIFIER_BYTES: usize = 16;

/// Length of an encoded identifier: 16 bytes in unpadded base32
pub const IDENTIFIER_LEN: usize = 26;

const PASSWORD_LEN: usize = 16;

/// Source of candidate device identifiers
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IdentifierGenerator: Send + Sync {
    fn generate_id(&self) -> String;
}

/// Uppercase RFC 4648 base32 over thread-local CSPRNG bytes.
///
/// Output only uses `[A-Z2-7]`, which is valid in NATS subject tokens,
/// Docker container names and (case-folded) DNS labels.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdentifierGenerator;

impl IdentifierGenerator for RandomIdentifierGenerator {
    fn generate_id(&self) -> String {
        let mut bytes = [0u8; IDENTIFIER_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        base32::encode(Alphabet::Rfc4648 { padding: false }, &bytes)
    }
}

/// Names every external resource of a device is known by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceNames {
    pub messaging_subject: String,
    pub container_name: String,
    pub stream_name: String,
}

impl DeviceNames {
    pub fn for_device(device_id: &str) -> Self {
        Self {
            messaging_subject: format!("devices.{}.telemetry", device_id),
            container_name: format!("adapter-{}", device_id),
            stream_name: format!("DEV_{}", device_id),
        }
    }
}

pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LEN)
        .map(char::from)
        .collect()
}
