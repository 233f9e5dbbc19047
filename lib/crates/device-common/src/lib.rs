pub mod config;
pub mod envelope;
pub mod manifest;
pub mod topics;

pub use config::{DeviceConfig, REBOOT_COMPLETED, REBOOT_PENDING};
pub use envelope::{
    Ack, CommandEnvelope, CommandResult, ResultEnvelope, RuntimeInfo, Status, UNKNOWN,
};
pub use manifest::{FrameworkManifest, Runtime};
pub use topics::{Topics, validate_segment};
