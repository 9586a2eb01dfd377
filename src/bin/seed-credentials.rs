//! Credential seeding utility.
//!
//! Writes Wi-Fi credentials straight into the credential store, skipping the
//! provisioning portal. Useful for bench setups and for booting the host
//! simulation in station mode.
//!
//! Usage:
//!   WIFI_SSID="MyNetwork" WIFI_PASSWORD="secret" cargo run --bin seed-credentials
//!
//! For open networks (no password):
//!   WIFI_SSID="OpenNetwork" WIFI_PASSWORD="" cargo run --bin seed-credentials
//!
//! On ESP32 the credentials are baked in at compile time (there is no runtime
//! environment on the device); on the host they are read when the tool runs.

use wifi_provisioner_esp32::creds::{CredentialError, Credentials};
use wifi_provisioner_esp32::store::CredentialStore;

/// WiFi SSID for the device build - set via WIFI_SSID at compile time.
#[cfg(feature = "esp32")]
const WIFI_SSID: Option<&str> = option_env!("WIFI_SSID");

/// WiFi password for the device build - empty string for open networks.
#[cfg(feature = "esp32")]
const WIFI_PASSWORD: Option<&str> = option_env!("WIFI_PASSWORD");

const USAGE: &str = "Usage:\n  \
     WIFI_SSID=\"MyNetwork\" WIFI_PASSWORD=\"secret\" cargo run --bin seed-credentials\n\n\
     For open networks:\n  \
     WIFI_SSID=\"OpenNetwork\" WIFI_PASSWORD=\"\" cargo run --bin seed-credentials";

/// Print error message and halt. On ESP32 we pause briefly first so the
/// serial output is flushed before the process exits.
fn halt_with_error(msg: &str) -> ! {
    eprintln!("\n{}", msg);
    eprintln!("\n=== Seeding failed ===\n");
    #[cfg(feature = "esp32")]
    std::thread::sleep(std::time::Duration::from_secs(2));
    std::process::exit(1);
}

/// Validate the fields and write them through the store.
fn seed(store: &mut dyn CredentialStore, ssid: &str, password: &str) {
    println!("SSID: {}", ssid);
    println!(
        "Password: {} ({} chars)",
        if password.is_empty() {
            "(none)"
        } else {
            "****"
        },
        password.len()
    );

    let creds = match Credentials::new(ssid, password) {
        Ok(creds) => creds,
        Err(CredentialError::SsidEmpty) => {
            halt_with_error("Error: SSID cannot be empty");
        }
        Err(CredentialError::SsidTooLong { len, max }) => {
            halt_with_error(&format!("Error: SSID too long ({} bytes, max {})", len, max));
        }
        Err(CredentialError::PasswordTooLong { len, max }) => {
            halt_with_error(&format!(
                "Error: password too long ({} bytes, max {})",
                len, max
            ));
        }
    };

    if let Err(e) = store.save(&creds) {
        halt_with_error(&format!("Error saving credentials: {}", e));
    }

    println!("\n=== Credentials saved ===");
    println!("\nThe device will connect to this network on next boot.");
}

#[cfg(feature = "esp32")]
fn main() {
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use wifi_provisioner_esp32::store::NvsCredentialStore;

    // Initialize ESP-IDF
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    println!("\n=== Credential Seeding Utility ===\n");

    let ssid = match WIFI_SSID {
        Some(s) if !s.is_empty() => s,
        _ => {
            halt_with_error(&format!(
                "Error: WIFI_SSID environment variable not set at compile time.\n\n{}",
                USAGE
            ));
        }
    };
    let password = WIFI_PASSWORD.unwrap_or("");

    let nvs = match EspDefaultNvsPartition::take() {
        Ok(nvs) => nvs,
        Err(e) => halt_with_error(&format!("Error taking NVS partition: {}", e)),
    };
    let mut store = NvsCredentialStore::new(nvs);
    seed(&mut store, ssid, password);

    println!("\n=== Done - you can disconnect the device ===\n");

    // Brief pause so the serial output is visible, then exit cleanly
    std::thread::sleep(std::time::Duration::from_secs(2));
}

#[cfg(not(feature = "esp32"))]
fn main() {
    use wifi_provisioner_esp32::store::FileCredentialStore;

    println!("\n=== Credential Seeding Utility ===\n");

    let ssid = match std::env::var("WIFI_SSID") {
        Ok(s) if !s.is_empty() => s,
        _ => {
            halt_with_error(&format!(
                "Error: WIFI_SSID environment variable not set.\n\n{}",
                USAGE
            ));
        }
    };
    let password = std::env::var("WIFI_PASSWORD").unwrap_or_default();

    let mut store = match FileCredentialStore::open_default() {
        Ok(store) => store,
        Err(e) => halt_with_error(&format!("Error opening credential store: {}", e)),
    };
    seed(&mut store, &ssid, &password);
}
