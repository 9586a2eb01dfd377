//! Lifecycle orchestration.
//!
//! One boot wires the event bridge and runs one controller bootstrap
//! pass. After that the process idles in a read-only supervisory loop;
//! every change of direction from then on happens through the portal
//! and the restart it schedules.

use log::info;
use std::thread;

use crate::config::STATUS_INTERVAL;
use crate::wifi::{Mode, Radio, WifiError, WifiManager};

/// Owns the controller for the life of the process.
pub struct App<R: Radio> {
    manager: WifiManager<R>,
}

impl<R: Radio + 'static> App<R> {
    pub fn new(manager: WifiManager<R>) -> Self {
        Self { manager }
    }

    /// Wire link events, then run one bootstrap pass and report the
    /// mode it settled in.
    pub fn bootstrap(&self) -> Result<Mode, WifiError> {
        self.manager.register_events()?;
        self.manager.start()
    }

    /// Log status forever. The loop only reads; all mutation happens
    /// through portal handlers and the restarts they schedule.
    pub fn supervise(&self) -> ! {
        loop {
            thread::sleep(STATUS_INTERVAL);
            self.log_status();
        }
    }

    /// One supervisory status line.
    pub fn log_status(&self) {
        match (self.manager.mode(), self.manager.current_address()) {
            (Mode::StationConnected, Some(addr)) => {
                info!("Status: connected, address {}", addr)
            }
            (mode, _) => info!("Status: {}", mode),
        }
    }
}
