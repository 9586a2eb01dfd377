//! ESP-IDF radio backend and event wiring.
//!
//! This module wraps the ESP-IDF WiFi driver behind the [`Radio`]
//! trait and translates system event loop notifications into
//! [`LinkEvent`]s. Only compiled for the device target.

use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::{EspSubscription, EspSystemEventLoop, System};
use esp_idf_svc::netif::IpEvent;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::EspError;
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, ClientConfiguration, Configuration, EspWifi, WifiEvent,
};

use crate::config::ApProfile;
use crate::creds::Credentials;
use crate::wifi::events::LinkEvent;
use crate::wifi::radio::{Radio, RadioError};

/// Radio backed by the ESP-IDF WiFi driver.
pub struct EspRadio {
    wifi: EspWifi<'static>,
}

impl EspRadio {
    /// Wrap the modem peripheral.
    ///
    /// The NVS partition is handed to the driver for its calibration
    /// data; it is the same default partition the credential store
    /// lives in.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<Self, EspError> {
        let wifi = EspWifi::new(modem, sysloop, Some(nvs))?;
        Ok(Self { wifi })
    }

    fn stop_if_started(&mut self) -> Result<(), EspError> {
        if self.wifi.is_started()? {
            self.wifi.stop()?;
        }
        Ok(())
    }
}

fn driver_err(e: EspError) -> RadioError {
    RadioError::Driver(e.to_string())
}

impl Radio for EspRadio {
    fn start_station(&mut self, creds: &Credentials) -> Result<(), RadioError> {
        self.stop_if_started().map_err(driver_err)?;

        // Determine auth method
        let auth_method = if creds.is_open() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        let config = Configuration::Client(ClientConfiguration {
            ssid: creds
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| RadioError::Driver("SSID too long for driver".to_string()))?,
            password: creds
                .password
                .as_str()
                .try_into()
                .map_err(|_| RadioError::Driver("password too long for driver".to_string()))?,
            auth_method,
            ..Default::default()
        });

        self.wifi.set_configuration(&config).map_err(driver_err)?;
        // The join itself is issued by the event handler once the
        // interface reports it has started
        self.wifi.start().map_err(driver_err)?;
        Ok(())
    }

    fn join(&mut self) -> Result<(), RadioError> {
        if !self.wifi.is_started().map_err(driver_err)? {
            return Err(RadioError::NotStarted);
        }
        self.wifi.connect().map_err(driver_err)
    }

    fn start_access_point(&mut self, profile: &ApProfile) -> Result<String, RadioError> {
        self.stop_if_started().map_err(driver_err)?;

        let config = Configuration::AccessPoint(AccessPointConfiguration {
            ssid: profile
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| RadioError::Driver("AP SSID too long for driver".to_string()))?,
            password: profile
                .password
                .as_str()
                .try_into()
                .map_err(|_| RadioError::Driver("AP password too long for driver".to_string()))?,
            auth_method: AuthMethod::WPAWPA2Personal,
            max_connections: profile.max_clients,
            ..Default::default()
        });

        self.wifi.set_configuration(&config).map_err(driver_err)?;
        self.wifi.start().map_err(driver_err)?;

        let ip_info = self.wifi.ap_netif().get_ip_info().map_err(driver_err)?;
        Ok(ip_info.ip.to_string())
    }

    fn stop(&mut self) -> Result<(), RadioError> {
        self.stop_if_started().map_err(driver_err)
    }
}

/// Keeps the event loop registrations alive. Dropping this
/// unregisters both callbacks.
pub struct LinkSubscriptions {
    _wifi: EspSubscription<'static, System>,
    _ip: EspSubscription<'static, System>,
}

/// Register for driver notifications, translating each one for
/// `handler`. The system event loop task serializes the callbacks.
pub fn subscribe_link_events<F>(
    sysloop: &EspSystemEventLoop,
    handler: F,
) -> Result<LinkSubscriptions, EspError>
where
    F: Fn(LinkEvent) + Send + Sync + Clone + 'static,
{
    let wifi_handler = handler.clone();
    let wifi = sysloop.subscribe::<WifiEvent, _>(move |event| match event {
        WifiEvent::StaStarted => wifi_handler(LinkEvent::StationStarted),
        WifiEvent::StaDisconnected(_) => wifi_handler(LinkEvent::Disconnected),
        _ => {}
    })?;

    let ip = sysloop.subscribe::<IpEvent, _>(move |event| {
        if let IpEvent::DhcpIpAssigned(assignment) = event {
            handler(LinkEvent::AddressAssigned(assignment.ip().to_string()));
        }
    })?;

    Ok(LinkSubscriptions { _wifi: wifi, _ip: ip })
}
