//! Simulated radio for host builds.
//!
//! `SimRadio` mimics the device driver's asynchronous shape: starting
//! the station emits [`LinkEvent::StationStarted`], and each join emits
//! either an address assignment or a refusal depending on the scripted
//! [`SimBehavior`]. The paired [`SimHandle`] lets tests reprogram the
//! behavior mid-run, inject raw events, and read call counters.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use crate::config::ApProfile;
use crate::creds::Credentials;
use crate::wifi::events::LinkEvent;
use crate::wifi::radio::{Radio, RadioError};

/// Address handed out when a simulated join succeeds.
pub const SIM_STATION_ADDRESS: &str = "192.168.1.100";
/// Address of the simulated provisioning access point.
pub const SIM_AP_ADDRESS: &str = "192.168.4.1";

/// Scripted response to join attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimBehavior {
    /// Every join gets an address.
    AcquireAddress,
    /// Every join is refused with a disconnect.
    RefuseJoin,
    /// The first `refusals` joins are refused, the next one succeeds.
    RefuseThenAcquire { refusals: u32 },
    /// Joins produce no follow-up event at all.
    Silent,
}

#[derive(Debug)]
struct SimShared {
    behavior: Mutex<SimBehavior>,
    station_started: Mutex<bool>,
    last_ssid: Mutex<Option<String>>,
    join_count: AtomicU32,
    stop_count: AtomicU32,
}

/// Host-side radio backend.
#[derive(Debug)]
pub struct SimRadio {
    events: mpsc::Sender<LinkEvent>,
    shared: Arc<SimShared>,
}

/// Test-side handle onto a [`SimRadio`].
#[derive(Debug, Clone)]
pub struct SimHandle {
    events: mpsc::Sender<LinkEvent>,
    shared: Arc<SimShared>,
}

impl SimRadio {
    /// Build a radio, its control handle, and the event stream the
    /// controller should bridge.
    pub fn new(behavior: SimBehavior) -> (Self, SimHandle, mpsc::Receiver<LinkEvent>) {
        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(SimShared {
            behavior: Mutex::new(behavior),
            station_started: Mutex::new(false),
            last_ssid: Mutex::new(None),
            join_count: AtomicU32::new(0),
            stop_count: AtomicU32::new(0),
        });
        let radio = Self {
            events: tx.clone(),
            shared: Arc::clone(&shared),
        };
        let handle = SimHandle { events: tx, shared };
        (radio, handle, rx)
    }

    fn emit(&self, event: LinkEvent) -> Result<(), RadioError> {
        self.events
            .send(event)
            .map_err(|_| RadioError::Driver("link event channel closed".to_string()))
    }
}

impl Radio for SimRadio {
    fn start_station(&mut self, creds: &Credentials) -> Result<(), RadioError> {
        *self.shared.station_started.lock().unwrap() = true;
        *self.shared.last_ssid.lock().unwrap() = Some(creds.ssid.clone());
        self.emit(LinkEvent::StationStarted)
    }

    fn join(&mut self) -> Result<(), RadioError> {
        if !*self.shared.station_started.lock().unwrap() {
            return Err(RadioError::NotStarted);
        }
        let joins = self.shared.join_count.fetch_add(1, Ordering::SeqCst) + 1;
        let behavior = *self.shared.behavior.lock().unwrap();
        match behavior {
            SimBehavior::AcquireAddress => {
                self.emit(LinkEvent::AddressAssigned(SIM_STATION_ADDRESS.to_string()))
            }
            SimBehavior::RefuseJoin => self.emit(LinkEvent::Disconnected),
            SimBehavior::RefuseThenAcquire { refusals } => {
                if joins <= refusals {
                    self.emit(LinkEvent::Disconnected)
                } else {
                    self.emit(LinkEvent::AddressAssigned(SIM_STATION_ADDRESS.to_string()))
                }
            }
            SimBehavior::Silent => Ok(()),
        }
    }

    fn start_access_point(&mut self, _profile: &ApProfile) -> Result<String, RadioError> {
        *self.shared.station_started.lock().unwrap() = false;
        Ok(SIM_AP_ADDRESS.to_string())
    }

    fn stop(&mut self) -> Result<(), RadioError> {
        *self.shared.station_started.lock().unwrap() = false;
        self.shared.stop_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl SimHandle {
    /// Reprogram how future joins behave.
    pub fn set_behavior(&self, behavior: SimBehavior) {
        *self.shared.behavior.lock().unwrap() = behavior;
    }

    /// Push a raw event into the stream, as if the driver reported it.
    pub fn inject(&self, event: LinkEvent) {
        // Ignored when the bridge is gone; nothing is listening anymore
        let _ = self.events.send(event);
    }

    /// Number of joins issued so far.
    pub fn join_count(&self) -> u32 {
        self.shared.join_count.load(Ordering::SeqCst)
    }

    /// Number of times the radio was torn down.
    pub fn stop_count(&self) -> u32 {
        self.shared.stop_count.load(Ordering::SeqCst)
    }

    /// SSID of the most recent station configuration.
    pub fn last_ssid(&self) -> Option<String> {
        self.shared.last_ssid.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn creds() -> Credentials {
        Credentials::new("TestNet", "secret123").unwrap()
    }

    // ==================== Simulated Radio Tests ====================

    #[test]
    fn test_station_start_emits_started_event() {
        let (mut radio, handle, rx) = SimRadio::new(SimBehavior::AcquireAddress);
        radio.start_station(&creds()).unwrap();

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            LinkEvent::StationStarted
        );
        assert_eq!(handle.last_ssid().as_deref(), Some("TestNet"));
    }

    #[test]
    fn test_join_before_start_is_rejected() {
        let (mut radio, _handle, _rx) = SimRadio::new(SimBehavior::AcquireAddress);
        assert_eq!(radio.join(), Err(RadioError::NotStarted));
    }

    #[test]
    fn test_join_outcome_follows_behavior() {
        let (mut radio, handle, rx) = SimRadio::new(SimBehavior::RefuseJoin);
        radio.start_station(&creds()).unwrap();
        let _ = rx.recv_timeout(Duration::from_secs(1)).unwrap();

        radio.join().unwrap();
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            LinkEvent::Disconnected
        );

        handle.set_behavior(SimBehavior::AcquireAddress);
        radio.join().unwrap();
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            LinkEvent::AddressAssigned(SIM_STATION_ADDRESS.to_string())
        );
        assert_eq!(handle.join_count(), 2);
    }

    #[test]
    fn test_refusals_run_out() {
        let (mut radio, _handle, rx) = SimRadio::new(SimBehavior::RefuseThenAcquire {
            refusals: 2,
        });
        radio.start_station(&creds()).unwrap();
        let _ = rx.recv_timeout(Duration::from_secs(1)).unwrap();

        for _ in 0..2 {
            radio.join().unwrap();
            assert_eq!(
                rx.recv_timeout(Duration::from_secs(1)).unwrap(),
                LinkEvent::Disconnected
            );
        }
        radio.join().unwrap();
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            LinkEvent::AddressAssigned(SIM_STATION_ADDRESS.to_string())
        );
    }

    #[test]
    fn test_silent_behavior_emits_nothing() {
        let (mut radio, _handle, rx) = SimRadio::new(SimBehavior::Silent);
        radio.start_station(&creds()).unwrap();
        let _ = rx.recv_timeout(Duration::from_secs(1)).unwrap();

        radio.join().unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_access_point_reports_own_address() {
        let (mut radio, handle, _rx) = SimRadio::new(SimBehavior::AcquireAddress);
        let addr = radio.start_access_point(&ApProfile::default()).unwrap();
        assert_eq!(addr, SIM_AP_ADDRESS);

        // Switching to AP tears the station down
        assert_eq!(radio.join(), Err(RadioError::NotStarted));
        assert_eq!(handle.stop_count(), 0);
    }

    #[test]
    fn test_injected_events_reach_the_stream() {
        let (_radio, handle, rx) = SimRadio::new(SimBehavior::AcquireAddress);
        handle.inject(LinkEvent::AddressAssigned("10.1.1.1".to_string()));
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            LinkEvent::AddressAssigned("10.1.1.1".to_string())
        );
    }
}
