//! File-backed credential store for host (development) builds.
//!
//! Mirrors the device's NVS layout with one file per key under a state
//! directory, `~/.wifi-provisioner-esp32` by default. A missing SSID file is
//! the unprovisioned state, exactly like a missing NVS key on the device.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use log::debug;

use super::{CredentialStore, StoreError};
use crate::config::{NVS_KEY_PASSWORD, NVS_KEY_SSID};
use crate::creds::Credentials;

/// Credential store persisting each key as a file.
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    /// Open the store at the default location (`~/.wifi-provisioner-esp32`).
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(default_state_dir()?)
    }

    /// Open the store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Write one key and flush it to disk before returning.
    fn write_key(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        let mut file = fs::File::create(&path)?;
        file.write_all(value.as_bytes())?;
        // The device backend commits each write; sync_all is the file
        // equivalent so a crash right after save still finds the record
        file.sync_all()?;

        // Verify write by reading back
        let read_back = fs::read_to_string(&path)?;
        if read_back != value {
            return Err(StoreError::Backend(format!(
                "verification failed for {}: wrote {} bytes, read {}",
                key,
                value.len(),
                read_back.len()
            )));
        }
        Ok(())
    }

    fn remove_key(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&mut self, creds: &Credentials) -> Result<(), StoreError> {
        self.write_key(NVS_KEY_SSID, &creds.ssid)?;
        self.write_key(NVS_KEY_PASSWORD, &creds.password)?;
        debug!("Credentials saved under {:?}", self.dir);
        Ok(())
    }

    fn load(&self) -> Result<Credentials, StoreError> {
        let ssid = match fs::read_to_string(self.key_path(NVS_KEY_SSID)) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NoCredentials)
            }
            Err(e) => return Err(e.into()),
        };

        // A missing password key is a valid empty password
        let password = match fs::read_to_string(self.key_path(NVS_KEY_PASSWORD)) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Credentials { ssid, password })
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.remove_key(NVS_KEY_SSID)?;
        self.remove_key(NVS_KEY_PASSWORD)?;
        debug!("Credentials cleared under {:?}", self.dir);
        Ok(())
    }
}

/// Default state directory, `$HOME/.wifi-provisioner-esp32`.
fn default_state_dir() -> Result<PathBuf, StoreError> {
    let home = std::env::var("HOME")
        .map_err(|_| StoreError::Backend("HOME not set".to_string()))?;
    Ok(PathBuf::from(home).join(".wifi-provisioner-esp32"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, FileCredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::open(dir.path()).unwrap();
        (dir, store)
    }

    // ==================== Round-Trip Tests ====================

    #[test]
    fn test_save_load_round_trip() {
        let (_dir, mut store) = temp_store();
        let creds = Credentials::new("HomeNet", "secret").unwrap();

        store.save(&creds).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded, creds);
    }

    #[test]
    fn test_empty_password_round_trips_empty() {
        let (_dir, mut store) = temp_store();
        let creds = Credentials::new("OpenNet", "").unwrap();

        store.save(&creds).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.ssid, "OpenNet");
        assert_eq!(loaded.password, "");
    }

    #[test]
    fn test_save_overwrites_previous_record() {
        let (_dir, mut store) = temp_store();
        store
            .save(&Credentials::new("OldNet", "oldpass").unwrap())
            .unwrap();
        store
            .save(&Credentials::new("NewNet", "newpass").unwrap())
            .unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.ssid, "NewNet");
        assert_eq!(loaded.password, "newpass");
    }

    #[test]
    fn test_max_length_fields_round_trip() {
        let (_dir, mut store) = temp_store();
        let creds = Credentials::new("a".repeat(32), "b".repeat(64)).unwrap();

        store.save(&creds).unwrap();
        assert_eq!(store.load().unwrap(), creds);
    }

    // ==================== Absence Tests ====================

    #[test]
    fn test_load_empty_store_is_no_credentials() {
        let (_dir, store) = temp_store();
        assert!(matches!(store.load(), Err(StoreError::NoCredentials)));
    }

    #[test]
    fn test_missing_password_key_reads_as_empty() {
        let (_dir, mut store) = temp_store();
        store
            .save(&Credentials::new("HomeNet", "secret").unwrap())
            .unwrap();
        fs::remove_file(store.key_path(NVS_KEY_PASSWORD)).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.ssid, "HomeNet");
        assert_eq!(loaded.password, "");
    }

    // ==================== Clear Tests ====================

    #[test]
    fn test_clear_removes_both_keys() {
        let (_dir, mut store) = temp_store();
        store
            .save(&Credentials::new("HomeNet", "secret").unwrap())
            .unwrap();

        store.clear().unwrap();

        assert!(matches!(store.load(), Err(StoreError::NoCredentials)));
        assert!(!store.key_path(NVS_KEY_SSID).exists());
        assert!(!store.key_path(NVS_KEY_PASSWORD).exists());
    }

    #[test]
    fn test_clear_on_empty_store_is_ok() {
        let (_dir, mut store) = temp_store();
        store.clear().unwrap();
        store.clear().unwrap();
    }
}
