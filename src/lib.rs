//! Wi-Fi provisioning firmware library.
//!
//! This library contains the network bootstrap controller for an
//! ESP32-class device: on boot it connects to a stored Wi-Fi network,
//! and when that is impossible it hosts its own access point with a
//! web provisioning form instead. Everything except the radio and
//! persistence backends is platform-independent and can be tested on
//! the host machine without ESP32 hardware.

pub mod app;
pub mod assets;
pub mod config;
pub mod creds;
pub mod portal;
pub mod reboot;
pub mod store;
pub mod wifi;

// Re-export commonly used items
pub use app::App;
pub use creds::{CredentialError, Credentials};
pub use store::{CredentialStore, SharedStore, StoreError};
pub use wifi::{ManagerConfig, Mode, WifiError, WifiManager};
