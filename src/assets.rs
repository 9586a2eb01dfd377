//! Location of the provisioning form asset.
//!
//! On the device the form lives on a SPIFFS partition mounted under
//! [`ASSET_MOUNT_POINT`](crate::config::ASSET_MOUNT_POINT); on the
//! host it is a plain directory next to the binary, overridable
//! through an environment variable for tests and packaging.

use std::path::PathBuf;

use crate::config::PROVISION_FORM_FILE;

#[cfg(not(feature = "esp32"))]
use crate::config::{ASSET_DIR_ENV, HOST_ASSET_DIR};

#[cfg(feature = "esp32")]
use crate::config::{ASSET_MOUNT_POINT, ASSET_PARTITION_LABEL};

/// Directory the assets are served from on the host.
#[cfg(not(feature = "esp32"))]
pub fn asset_dir() -> PathBuf {
    std::env::var_os(ASSET_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(HOST_ASSET_DIR))
}

/// Full path of the provisioning form document.
#[cfg(not(feature = "esp32"))]
pub fn form_path() -> PathBuf {
    asset_dir().join(PROVISION_FORM_FILE)
}

/// Full path of the provisioning form document.
#[cfg(feature = "esp32")]
pub fn form_path() -> PathBuf {
    PathBuf::from(ASSET_MOUNT_POINT).join(PROVISION_FORM_FILE)
}

/// Mount the SPIFFS asset partition.
///
/// A mount failure leaves the device running; the portal then answers
/// form requests with 404 until the partition is flashed.
#[cfg(feature = "esp32")]
pub fn mount_assets() -> Result<(), esp_idf_svc::sys::EspError> {
    use esp_idf_svc::sys::{esp, esp_spiffs_info, esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register};
    use std::ffi::CString;

    let base_path = CString::new(ASSET_MOUNT_POINT).expect("static path");
    let label = CString::new(ASSET_PARTITION_LABEL).expect("static label");

    let conf = esp_vfs_spiffs_conf_t {
        base_path: base_path.as_ptr(),
        partition_label: label.as_ptr(),
        max_files: 5,
        format_if_mount_failed: true,
    };
    esp!(unsafe { esp_vfs_spiffs_register(&conf) })?;

    let mut total: usize = 0;
    let mut used: usize = 0;
    if esp!(unsafe { esp_spiffs_info(label.as_ptr(), &mut total, &mut used) }).is_ok() {
        log::info!(
            "Asset filesystem mounted at {} ({} of {} bytes used)",
            ASSET_MOUNT_POINT,
            used,
            total
        );
    }
    Ok(())
}

#[cfg(all(test, not(feature = "esp32")))]
mod tests {
    use super::*;

    // ==================== Asset Path Tests ====================

    #[test]
    fn test_form_path_default_and_override() {
        // One test covers both cases: the env var is process-global,
        // so splitting these would race under the parallel test runner
        std::env::remove_var(ASSET_DIR_ENV);
        assert_eq!(
            form_path(),
            PathBuf::from(HOST_ASSET_DIR).join(PROVISION_FORM_FILE)
        );

        std::env::set_var(ASSET_DIR_ENV, "/tmp/custom-assets");
        assert_eq!(
            form_path(),
            PathBuf::from("/tmp/custom-assets").join(PROVISION_FORM_FILE)
        );
        std::env::remove_var(ASSET_DIR_ENV);
    }
}
