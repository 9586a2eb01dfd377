//! Wi-Fi provisioning firmware binary.
//!
//! Runs on both ESP32 and host platforms:
//! - **Host**: `cargo run` (simulated radio, portal on port 8080)
//! - **ESP32**: `cargo espflash flash --features esp32 --release`
//!
//! On boot the device connects to the network stored in NVS. Without
//! stored credentials (or when the connection fails) it opens the
//! `ESP32-Provisioning` access point and serves the provisioning form
//! on port 80.

use log::info;
use std::sync::Arc;

use wifi_provisioner_esp32::app::App;
use wifi_provisioner_esp32::store::shared;
use wifi_provisioner_esp32::wifi::{ManagerConfig, WifiManager};

// ESP32: Initialize ESP-IDF before anything else
#[cfg(feature = "esp32")]
fn platform_init() {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    info!("ESP-IDF initialized");
}

// Host: Just initialize env_logger
#[cfg(not(feature = "esp32"))]
fn platform_init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[cfg(feature = "esp32")]
fn main() {
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use wifi_provisioner_esp32::assets;
    use wifi_provisioner_esp32::reboot::EspReboot;
    use wifi_provisioner_esp32::store::NvsCredentialStore;
    use wifi_provisioner_esp32::wifi::esp::EspRadio;

    platform_init();
    info!("=== Wi-Fi provisioner starting ===");

    let peripherals = Peripherals::take().expect("Failed to take peripherals");
    let sysloop = EspSystemEventLoop::take().expect("Failed to take system event loop");
    let nvs = EspDefaultNvsPartition::take().expect("Failed to take NVS partition");

    // The form just 404s until the partition is flashed; not fatal
    if let Err(e) = assets::mount_assets() {
        log::error!("Failed to mount asset filesystem: {}", e);
    }

    let store = shared(NvsCredentialStore::new(nvs.clone()));
    let radio = EspRadio::new(peripherals.modem, sysloop.clone(), nvs)
        .expect("Failed to initialize WiFi driver");

    let manager = WifiManager::new(
        radio,
        sysloop,
        store,
        Arc::new(EspReboot),
        ManagerConfig::default(),
    );

    let app = App::new(manager);
    let mode = app.bootstrap().expect("Bootstrap failed");
    info!("Bootstrap settled in mode: {}", mode);
    app.supervise();
}

#[cfg(not(feature = "esp32"))]
fn main() {
    use wifi_provisioner_esp32::reboot::HostReboot;
    use wifi_provisioner_esp32::store::FileCredentialStore;
    use wifi_provisioner_esp32::wifi::sim::{SimBehavior, SimRadio};

    platform_init();
    info!("=== Wi-Fi provisioner starting (host simulation) ===");

    let store = shared(FileCredentialStore::open_default().expect("Failed to open credential store"));
    let (radio, _handle, events) = SimRadio::new(SimBehavior::AcquireAddress);

    let manager = WifiManager::new(
        radio,
        events,
        store,
        Arc::new(HostReboot),
        ManagerConfig::default(),
    );

    let app = App::new(manager);
    match app.bootstrap() {
        Ok(mode) => info!("Bootstrap settled in mode: {}", mode),
        Err(e) => {
            log::error!("Bootstrap failed: {}", e);
            std::process::exit(1);
        }
    }
    app.supervise();
}
