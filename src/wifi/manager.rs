//! Network mode controller.
//!
//! [`WifiManager`] owns the connection state machine, the radio
//! backend, and the portal slot, and is the only writer to any of
//! them. The boot sequence drives it synchronously (`start`, `connect`,
//! `start_provisioning`); link events drive it asynchronously through
//! `handle_event` on the event dispatch thread.
//!
//! Locking: the manager holds at most one lock at a time. Every method
//! takes a lock, reads or writes, and releases it before touching the
//! next resource, so the event thread, HTTP handlers, and the
//! supervisory loop never deadlock against each other.

use log::{info, warn};
use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[cfg(not(feature = "esp32"))]
use std::sync::mpsc;

#[cfg(feature = "esp32")]
use esp_idf_svc::eventloop::EspSystemEventLoop;

use crate::config::{
    ApProfile, CONNECT_TIMEOUT, HOST_PORTAL_PORT, MAX_CONNECT_RETRIES, PORTAL_PORT,
};
use crate::creds::{CredentialError, Credentials};
use crate::portal::{Portal, PortalScope};
use crate::reboot::Reboot;
use crate::store::{SharedStore, StoreError};
use crate::wifi::events::LinkEvent;
#[cfg(not(feature = "esp32"))]
use crate::wifi::events::spawn_bridge;
use crate::wifi::outcome::{ConnectOutcome, OutcomeLatch};
use crate::wifi::radio::{Radio, RadioError};
use crate::wifi::state::{ConnectionState, DisconnectAction, Mode};

/// Runtime knobs for the controller.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Port the portal binds to (0 picks a free one).
    pub portal_port: u16,
    /// How long `start` waits for a terminal connection outcome.
    pub connect_timeout: Duration,
    /// Identity of the provisioning access point.
    pub ap_profile: ApProfile,
    /// Provisioning form document served by `GET /`.
    pub form_path: PathBuf,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            portal_port: if cfg!(feature = "esp32") {
                PORTAL_PORT
            } else {
                HOST_PORTAL_PORT
            },
            connect_timeout: CONNECT_TIMEOUT,
            ap_profile: ApProfile::default(),
            form_path: crate::assets::form_path(),
        }
    }
}

/// Controller-level failure.
#[derive(Debug)]
pub enum WifiError {
    /// Rejected input; nothing was touched.
    InvalidArgument(CredentialError),
    /// The radio backend refused an operation.
    Radio(RadioError),
    /// The portal could not be started.
    Portal(std::io::Error),
    /// Link event delivery could not be wired up.
    EventLoop(String),
}

impl fmt::Display for WifiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(e) => write!(f, "invalid argument: {}", e),
            Self::Radio(e) => write!(f, "{}", e),
            Self::Portal(e) => write!(f, "portal error: {}", e),
            Self::EventLoop(msg) => write!(f, "event loop error: {}", msg),
        }
    }
}

impl Error for WifiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidArgument(e) => Some(e),
            Self::Radio(e) => Some(e),
            Self::Portal(e) => Some(e),
            Self::EventLoop(_) => None,
        }
    }
}

impl From<CredentialError> for WifiError {
    fn from(e: CredentialError) -> Self {
        Self::InvalidArgument(e)
    }
}

impl From<RadioError> for WifiError {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}

/// State shared between the controller and the event dispatch thread.
pub(crate) struct LinkCore<R: Radio> {
    state: Mutex<ConnectionState>,
    latch: OutcomeLatch,
    radio: Mutex<R>,
}

impl<R: Radio> LinkCore<R> {
    fn new(radio: R) -> Self {
        Self {
            state: Mutex::new(ConnectionState::new()),
            latch: OutcomeLatch::new(),
            radio: Mutex::new(radio),
        }
    }

    /// Translate one link notification into a state transition.
    ///
    /// Runs on the event dispatch thread, serialized with itself but
    /// concurrent with everything else.
    pub(crate) fn handle_event(&self, event: LinkEvent) {
        match event {
            LinkEvent::StationStarted => {
                let connecting =
                    self.state.lock().unwrap().mode() == Mode::StationConnecting;
                if connecting {
                    if let Err(e) = self.radio.lock().unwrap().join() {
                        warn!("Join after interface start failed: {}", e);
                    }
                }
            }
            LinkEvent::Disconnected => {
                let action = self.state.lock().unwrap().record_disconnect();
                match action {
                    DisconnectAction::Retry { attempt } => {
                        info!(
                            "Disconnected, retrying ({}/{})",
                            attempt, MAX_CONNECT_RETRIES
                        );
                        if let Err(e) = self.radio.lock().unwrap().join() {
                            warn!("Rejoin failed: {}", e);
                        }
                    }
                    DisconnectAction::GiveUp => {
                        warn!("Connection retries exhausted");
                        self.latch.signal_failed();
                    }
                    DisconnectAction::Ignore => {}
                }
            }
            LinkEvent::AddressAssigned(addr) => {
                let mut state = self.state.lock().unwrap();
                match state.mode() {
                    Mode::StationConnecting | Mode::StationConnected => {
                        info!("Got address: {}", addr);
                        state.record_address(addr);
                        drop(state);
                        self.latch.signal_connected();
                    }
                    Mode::Uninitialized | Mode::AccessPointProvisioning => {}
                }
            }
        }
    }
}

/// The network mode controller.
pub struct WifiManager<R: Radio> {
    core: Arc<LinkCore<R>>,
    store: SharedStore,
    reboot: Arc<dyn Reboot>,
    config: ManagerConfig,
    portal: Mutex<Option<Portal>>,
    #[cfg(not(feature = "esp32"))]
    events: Mutex<Option<mpsc::Receiver<LinkEvent>>>,
    #[cfg(feature = "esp32")]
    sysloop: EspSystemEventLoop,
    #[cfg(feature = "esp32")]
    subscriptions: Mutex<Option<crate::wifi::esp::LinkSubscriptions>>,
}

#[cfg(not(feature = "esp32"))]
impl<R: Radio + 'static> WifiManager<R> {
    /// Build a controller around a radio and its event stream.
    pub fn new(
        radio: R,
        events: mpsc::Receiver<LinkEvent>,
        store: SharedStore,
        reboot: Arc<dyn Reboot>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            core: Arc::new(LinkCore::new(radio)),
            store,
            reboot,
            config,
            portal: Mutex::new(None),
            events: Mutex::new(Some(events)),
        }
    }

    /// Wire link events into `handle_event`. Must run before the first
    /// `start` or `connect`; later calls are no-ops.
    pub fn register_events(&self) -> Result<(), WifiError> {
        let events = self.events.lock().unwrap().take();
        if let Some(events) = events {
            let core = Arc::clone(&self.core);
            // The bridge thread ends on its own once the radio is dropped
            spawn_bridge(events, move |event| core.handle_event(event))
                .map_err(|e| WifiError::EventLoop(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(feature = "esp32")]
impl<R: Radio + 'static> WifiManager<R> {
    /// Build a controller around a radio and the system event loop.
    pub fn new(
        radio: R,
        sysloop: EspSystemEventLoop,
        store: SharedStore,
        reboot: Arc<dyn Reboot>,
        config: ManagerConfig,
    ) -> Self {
        Self {
            core: Arc::new(LinkCore::new(radio)),
            store,
            reboot,
            config,
            portal: Mutex::new(None),
            sysloop,
            subscriptions: Mutex::new(None),
        }
    }

    /// Wire link events into `handle_event`. Must run before the first
    /// `start` or `connect`; later calls are no-ops.
    pub fn register_events(&self) -> Result<(), WifiError> {
        let mut slot = self.subscriptions.lock().unwrap();
        if slot.is_none() {
            let core = Arc::clone(&self.core);
            let subscriptions = crate::wifi::esp::subscribe_link_events(
                &self.sysloop,
                move |event| core.handle_event(event),
            )
            .map_err(|e| WifiError::EventLoop(e.to_string()))?;
            *slot = Some(subscriptions);
        }
        Ok(())
    }
}

impl<R: Radio + 'static> WifiManager<R> {
    /// One bootstrap pass: tear down whatever is live, try the station
    /// with stored credentials, fall back to the provisioning access
    /// point. Blocks until the link settles or the connect timeout
    /// elapses, then returns the mode the controller landed in.
    pub fn start(&self) -> Result<Mode, WifiError> {
        self.stop()?;

        match self.load_credentials() {
            Some(creds) => {
                info!("Found stored credentials for '{}'", creds.ssid);
                match self.connect(&creds) {
                    Ok(()) => self.settle_attempt(&creds)?,
                    Err(WifiError::InvalidArgument(e)) => {
                        warn!("Stored credentials are unusable ({}), entering provisioning", e);
                        self.start_provisioning()?;
                    }
                    Err(e) => return Err(e),
                }
            }
            None => {
                self.start_provisioning()?;
            }
        }
        Ok(self.mode())
    }

    fn load_credentials(&self) -> Option<Credentials> {
        match self.store.lock().unwrap().load() {
            Ok(creds) => Some(creds),
            Err(StoreError::NoCredentials) => {
                info!("No stored credentials");
                None
            }
            Err(e) => {
                // An unreadable record is the unprovisioned state; the
                // portal is the only way out either way
                warn!("Failed to load credentials: {}", e);
                None
            }
        }
    }

    /// Wait out an initiated attempt and bring up the portal matching
    /// where the link ended.
    fn settle_attempt(&self, creds: &Credentials) -> Result<(), WifiError> {
        match self.core.latch.wait(self.config.connect_timeout) {
            ConnectOutcome::Connected => {
                if let Some(addr) = self.current_address() {
                    info!("Connected to '{}' with address {}", creds.ssid, addr);
                }
                self.start_reset_portal()?;
            }
            ConnectOutcome::Failed => {
                warn!("Failed to connect to '{}', falling back to provisioning", creds.ssid);
                self.start_provisioning()?;
            }
            ConnectOutcome::TimedOut => {
                warn!("No connection outcome within the timeout, falling back to provisioning");
                self.start_provisioning()?;
            }
        }
        Ok(())
    }

    /// Initiate a station connection with the given credentials.
    ///
    /// Over-long fields are clamped to their byte bounds; only an empty
    /// SSID is rejected, with no side effects. Initiation only: the
    /// outcome arrives through the event bridge, and `start` is the
    /// waiter that acts on it.
    pub fn connect(&self, creds: &Credentials) -> Result<(), WifiError> {
        let creds = Credentials::truncated(&creds.ssid, &creds.password)?;

        info!("Connecting to '{}'", creds.ssid);
        self.core.latch.arm();
        self.core.state.lock().unwrap().begin_station_attempt();

        let started = self.core.radio.lock().unwrap().start_station(&creds);
        if let Err(e) = started {
            self.core.state.lock().unwrap().reset();
            return Err(WifiError::Radio(e));
        }
        Ok(())
    }

    /// Tear down whatever is running and host the provisioning AP with
    /// the full provisioning portal. Returns the AP's own address.
    pub fn start_provisioning(&self) -> Result<String, WifiError> {
        info!(
            "Starting provisioning access point '{}'",
            self.config.ap_profile.ssid
        );
        self.stop_portal();

        let addr = self
            .core
            .radio
            .lock()
            .unwrap()
            .start_access_point(&self.config.ap_profile)?;
        self.core.state.lock().unwrap().begin_provisioning();

        self.serve_portal(PortalScope::Provision)?;
        info!(
            "Provisioning portal at http://{}:{}",
            addr, self.config.portal_port
        );
        Ok(addr)
    }

    /// Expose the credential-reset route while connected.
    pub fn start_reset_portal(&self) -> Result<(), WifiError> {
        self.serve_portal(PortalScope::Reset)
    }

    /// Stop the portal and the radio and return to the pristine mode.
    pub fn stop(&self) -> Result<(), WifiError> {
        self.stop_portal();
        self.core.radio.lock().unwrap().stop()?;
        self.core.state.lock().unwrap().reset();
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        self.core.state.lock().unwrap().mode()
    }

    pub fn is_connected(&self) -> bool {
        self.core.state.lock().unwrap().is_connected()
    }

    pub fn retry_count(&self) -> u8 {
        self.core.state.lock().unwrap().retry_count()
    }

    pub fn current_address(&self) -> Option<String> {
        self.core
            .state
            .lock()
            .unwrap()
            .current_address()
            .map(str::to_string)
    }

    /// Port of the live portal instance, if one is up.
    pub fn portal_port(&self) -> Option<u16> {
        self.portal.lock().unwrap().as_ref().map(|p| p.port())
    }

    fn serve_portal(&self, scope: PortalScope) -> Result<(), WifiError> {
        // One live instance at a time: the old one goes down first so
        // the new one can take the port
        self.stop_portal();
        let portal = Portal::start(
            scope,
            self.config.portal_port,
            self.config.form_path.clone(),
            self.store.clone(),
            self.reboot.clone(),
        )
        .map_err(WifiError::Portal)?;
        *self.portal.lock().unwrap() = Some(portal);
        Ok(())
    }

    fn stop_portal(&self) {
        let portal = self.portal.lock().unwrap().take();
        if let Some(mut portal) = portal {
            portal.stop();
        }
    }
}

impl<R: Radio> Drop for WifiManager<R> {
    fn drop(&mut self) {
        let portal = self.portal.lock().unwrap().take();
        if let Some(mut portal) = portal {
            portal.stop();
        }
    }
}
