//! Static configuration: credential bounds, provisioning AP identity,
//! NVS layout, asset locations, and protocol timing.
//!
//! Everything here is a compile-time constant. Runtime-tunable knobs
//! (portal port, timeouts) live in [`crate::wifi::ManagerConfig`], which
//! defaults to these values.

use std::time::Duration;

/// Maximum SSID length per IEEE 802.11 standard.
pub const MAX_SSID_LEN: usize = 32;

/// Maximum password length for WPA2.
pub const MAX_PASSWORD_LEN: usize = 64;

/// Disconnect-triggered reconnect attempts before one station attempt
/// sequence is declared failed.
pub const MAX_CONNECT_RETRIES: u8 = 5;

/// How long the boot sequence waits for a station connection outcome
/// before falling back to provisioning mode.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause between an HTTP acknowledgement and the restart it triggers,
/// long enough for the response to flush to the client.
pub const RESTART_DELAY: Duration = Duration::from_secs(1);

/// Interval between supervisory status log lines.
pub const STATUS_INTERVAL: Duration = Duration::from_secs(10);

/// Largest accepted credential submission body. A urlencoded SSID plus
/// password tops out well under this even with every byte escaped.
pub const MAX_FORM_BODY: usize = 512;

/// Portal port on the device.
pub const PORTAL_PORT: u16 = 80;

/// Portal port on the host, where binding 80 needs privileges.
pub const HOST_PORTAL_PORT: u16 = 8080;

/// NVS namespace holding the credential record.
pub const NVS_NAMESPACE: &str = "storage";

/// NVS key for the stored SSID. Absence of this key means the device is
/// unprovisioned.
pub const NVS_KEY_SSID: &str = "wifi_ssid";

/// NVS key for the stored password. Absence means an empty password.
pub const NVS_KEY_PASSWORD: &str = "wifi_pass";

/// SSID broadcast by the provisioning access point.
pub const PROVISION_AP_SSID: &str = "ESP32-Provisioning";

/// Passphrase of the provisioning access point (WPA needs at least 8 chars).
pub const PROVISION_AP_PASSWORD: &str = "password123";

/// Station limit for the provisioning access point. One operator at a time.
pub const PROVISION_AP_MAX_CLIENTS: u16 = 1;

/// VFS mount point of the asset partition on the device.
pub const ASSET_MOUNT_POINT: &str = "/spiffs";

/// Flash partition label of the asset partition (see `partitions.csv`).
pub const ASSET_PARTITION_LABEL: &str = "storage";

/// File name of the provisioning form document.
pub const PROVISION_FORM_FILE: &str = "index.html";

/// Environment variable overriding the asset directory on the host.
pub const ASSET_DIR_ENV: &str = "WIFI_PROVISIONER_ASSETS";

/// Default asset directory on the host.
pub const HOST_ASSET_DIR: &str = "assets";

/// Identity of the provisioning access point. Fixed at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApProfile {
    /// SSID the access point broadcasts.
    pub ssid: String,
    /// WPA/WPA2 passphrase.
    pub password: String,
    /// Maximum simultaneous stations.
    pub max_clients: u16,
}

impl Default for ApProfile {
    fn default() -> Self {
        Self {
            ssid: PROVISION_AP_SSID.to_string(),
            password: PROVISION_AP_PASSWORD.to_string(),
            max_clients: PROVISION_AP_MAX_CLIENTS,
        }
    }
}
