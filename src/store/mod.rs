//! Credential persistence.
//!
//! One trait, two backends:
//! - **ESP32** (`esp32` feature): NVS, namespace `storage`, one key per field.
//! - **Host**: one file per key under a state directory.
//!
//! The record is two string keys. Absence of the SSID key is the canonical
//! "unprovisioned" state and surfaces as [`StoreError::NoCredentials`],
//! distinct from an empty SSID (which is rejected before it ever reaches a
//! store). An absent password key reads back as an empty password.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::creds::Credentials;

#[cfg(feature = "esp32")]
mod nvs;

#[cfg(not(feature = "esp32"))]
mod host;

// Re-exports
#[cfg(feature = "esp32")]
pub use nvs::NvsCredentialStore;

#[cfg(not(feature = "esp32"))]
pub use host::FileCredentialStore;

/// Durable credential persistence.
///
/// Every call is a full open → operate → commit → close sequence against the
/// backend; implementations keep no live handle between calls.
pub trait CredentialStore: Send {
    /// Persist both fields, replacing any existing record.
    ///
    /// A failure on either key aborts the save; a partial write is never
    /// reported as success.
    fn save(&mut self, creds: &Credentials) -> Result<(), StoreError>;

    /// Read the stored record.
    ///
    /// Fails with [`StoreError::NoCredentials`] when the SSID key is absent.
    fn load(&self) -> Result<Credentials, StoreError>;

    /// Erase both keys. Erasing an already-absent key is not an error.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// A credential store shared between the controller and the portal thread.
pub type SharedStore = Arc<Mutex<dyn CredentialStore>>;

/// Wrap a concrete store for shared use.
pub fn shared(store: impl CredentialStore + 'static) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Errors from credential persistence.
#[derive(Debug)]
pub enum StoreError {
    /// No SSID key in the store: the device has never been provisioned
    /// (or was reset). Callers treat this as a state, not a fault.
    NoCredentials,
    /// The storage backend failed (open/read/write/commit).
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no stored credentials"),
            Self::Backend(msg) => write!(f, "storage backend error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

#[cfg(feature = "esp32")]
impl From<esp_idf_sys::EspError> for StoreError {
    fn from(e: esp_idf_sys::EspError) -> Self {
        Self::Backend(format!("{}", e))
    }
}
