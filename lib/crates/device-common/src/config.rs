use serde::{Deserialize, Serialize};

/// Reboot marker value written before the agent reboots the device.
pub const REBOOT_PENDING: &str = "rebooting";
/// Reboot marker value once the deferred reply has been published.
pub const REBOOT_COMPLETED: &str = "completed";

/// Device identity and control-channel settings (`device.config/config.json`).
///
/// Keys are lower-case on disk. Fields absent from the file read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub assetcode: String,
    #[serde(default)]
    pub devicetype: String,
    #[serde(default)]
    pub mqtturl: String,
    #[serde(default)]
    pub projectcode: String,
    #[serde(default)]
    pub servicecode: String,
    #[serde(default)]
    pub servicetype: String,
    #[serde(default)]
    pub serverip: String,
    #[serde(default)]
    pub reboot: String,
    #[serde(default)]
    pub requestid: String,
}

impl DeviceConfig {
    /// Whether a reboot was requested by the previous process and not yet reported.
    #[must_use]
    pub fn reboot_pending(&self) -> bool {
        self.reboot == REBOOT_PENDING
    }

    #[must_use]
    pub fn is_onprem(&self) -> bool {
        self.servicetype == "onprem"
    }
}
