//! NVS-backed credential store for the device.
//!
//! Every operation opens a fresh handle on the `storage` namespace, performs
//! its reads or committed writes, and drops the handle before returning.

use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};
use esp_idf_sys::{EspError, ESP_ERR_NVS_NOT_FOUND};
use log::debug;

use super::{CredentialStore, StoreError};
use crate::config::{
    MAX_PASSWORD_LEN, MAX_SSID_LEN, NVS_KEY_PASSWORD, NVS_KEY_SSID, NVS_NAMESPACE,
};
use crate::creds::Credentials;

/// Credential store over the default NVS partition.
pub struct NvsCredentialStore {
    partition: EspNvsPartition<NvsDefault>,
}

impl NvsCredentialStore {
    /// Create a store over the given partition.
    ///
    /// The partition handle is cheap to clone and can be shared with the
    /// Wi-Fi driver.
    pub fn new(partition: EspNvsPartition<NvsDefault>) -> Self {
        Self { partition }
    }

    /// Open a namespace handle for the duration of one operation.
    fn open(&self, read_write: bool) -> Result<EspNvs<NvsDefault>, EspError> {
        EspNvs::new(self.partition.clone(), NVS_NAMESPACE, read_write)
    }
}

impl CredentialStore for NvsCredentialStore {
    fn save(&mut self, creds: &Credentials) -> Result<(), StoreError> {
        let mut nvs = self.open(true)?;
        nvs.set_str(NVS_KEY_SSID, &creds.ssid)?;
        nvs.set_str(NVS_KEY_PASSWORD, &creds.password)?;
        // set_str commits each write before returning; dropping the handle
        // closes it
        debug!("Credentials committed to NVS");
        Ok(())
    }

    fn load(&self) -> Result<Credentials, StoreError> {
        let nvs = match self.open(false) {
            Ok(nvs) => nvs,
            // The namespace itself does not exist until the first save
            Err(e) if is_not_found(&e) => return Err(StoreError::NoCredentials),
            Err(e) => return Err(e.into()),
        };

        // get_str needs room for the value plus its NUL terminator
        let mut ssid_buf = [0u8; MAX_SSID_LEN + 1];
        let ssid = match nvs.get_str(NVS_KEY_SSID, &mut ssid_buf)? {
            Some(s) => s.to_string(),
            None => return Err(StoreError::NoCredentials),
        };

        // A missing password key is a valid empty password
        let mut password_buf = [0u8; MAX_PASSWORD_LEN + 1];
        let password = match nvs.get_str(NVS_KEY_PASSWORD, &mut password_buf)? {
            Some(s) => s.to_string(),
            None => String::new(),
        };

        Ok(Credentials { ssid, password })
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        let mut nvs = self.open(true)?;
        // remove() reports false for an absent key, which is fine here
        nvs.remove(NVS_KEY_SSID)?;
        nvs.remove(NVS_KEY_PASSWORD)?;
        debug!("Credentials erased from NVS");
        Ok(())
    }
}

fn is_not_found(e: &EspError) -> bool {
    e.code() == ESP_ERR_NVS_NOT_FOUND as i32
}
