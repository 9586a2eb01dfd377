//! Connection state machine for the network mode controller.
//!
//! All mode/retry/address mutation funnels through [`ConnectionState`]
//! methods so the invariants hold at every step:
//! - the address is present if and only if the mode is `StationConnected`
//! - the retry counter resets to 0 exactly on entering `StationConnected`
//!   and increments only while `StationConnecting`

use std::fmt;

use crate::config::MAX_CONNECT_RETRIES;

/// Operating mode of the Wi-Fi subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Radio not configured yet.
    Uninitialized,
    /// Station configured, waiting for a join and an address.
    StationConnecting,
    /// Station joined with an address assigned.
    StationConnected,
    /// Hosting the provisioning access point.
    AccessPointProvisioning,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::StationConnecting => "connecting",
            Self::StationConnected => "connected",
            Self::AccessPointProvisioning => "provisioning",
        };
        write!(f, "{}", s)
    }
}

/// What the controller should do about a link-layer disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectAction {
    /// Re-issue the join; `attempt` is the retry just consumed (1-based).
    Retry { attempt: u8 },
    /// Retries exhausted; latch the failed outcome.
    GiveUp,
    /// Not in station mode; stray notification.
    Ignore,
}

/// Mutable connection status owned by the controller.
#[derive(Debug)]
pub struct ConnectionState {
    mode: Mode,
    retry_count: u8,
    current_address: Option<String>,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self {
            mode: Mode::Uninitialized,
            retry_count: 0,
            current_address: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    pub fn current_address(&self) -> Option<&str> {
        self.current_address.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.mode == Mode::StationConnected
    }

    /// Enter station mode for a new connection attempt sequence.
    ///
    /// The retry counter is deliberately left alone: within one boot a
    /// failed sequence stays failed, it does not get fresh retries.
    pub fn begin_station_attempt(&mut self) {
        self.mode = Mode::StationConnecting;
        self.current_address = None;
    }

    /// Enter access-point provisioning mode.
    pub fn begin_provisioning(&mut self) {
        self.mode = Mode::AccessPointProvisioning;
        self.current_address = None;
    }

    /// Return to the pristine mode after an explicit teardown.
    pub fn reset(&mut self) {
        self.mode = Mode::Uninitialized;
        self.current_address = None;
    }

    /// Record an address assignment: the station is connected.
    pub fn record_address(&mut self, addr: String) {
        self.mode = Mode::StationConnected;
        self.retry_count = 0;
        self.current_address = Some(addr);
    }

    /// Record a link-layer disconnect and decide the follow-up.
    pub fn record_disconnect(&mut self) -> DisconnectAction {
        match self.mode {
            Mode::StationConnected => {
                // Leaving the connected state is the moment the address goes
                self.mode = Mode::StationConnecting;
                self.current_address = None;
                self.apply_retry_policy()
            }
            Mode::StationConnecting => self.apply_retry_policy(),
            Mode::Uninitialized | Mode::AccessPointProvisioning => DisconnectAction::Ignore,
        }
    }

    fn apply_retry_policy(&mut self) -> DisconnectAction {
        if self.retry_count < MAX_CONNECT_RETRIES {
            self.retry_count += 1;
            DisconnectAction::Retry {
                attempt: self.retry_count,
            }
        } else {
            DisconnectAction::GiveUp
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}
