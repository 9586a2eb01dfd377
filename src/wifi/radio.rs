//! Radio backend seam.
//!
//! The controller drives the link through this trait so the same state
//! machine runs against the ESP-IDF driver on hardware and against
//! [`SimRadio`](super::sim::SimRadio) in host tests.

use std::error::Error;
use std::fmt;

use crate::config::ApProfile;
use crate::creds::Credentials;

/// Abstraction over the Wi-Fi driver.
///
/// Start calls tear down whatever interface was previously running, so
/// callers never sequence an explicit stop before switching modes.
/// Outcomes of a join arrive asynchronously as
/// [`LinkEvent`](super::events::LinkEvent)s, not as return values.
pub trait Radio: Send {
    /// Configure and bring up the station interface for `creds`.
    fn start_station(&mut self, creds: &Credentials) -> Result<(), RadioError>;

    /// Issue (or re-issue) the join for the configured station.
    fn join(&mut self) -> Result<(), RadioError>;

    /// Bring up the provisioning access point; returns its own address.
    fn start_access_point(&mut self, profile: &ApProfile) -> Result<String, RadioError>;

    /// Tear down whichever interface is running.
    fn stop(&mut self) -> Result<(), RadioError>;
}

/// Failure reported by a radio backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioError {
    /// A join was issued with no station configured.
    NotStarted,
    /// The underlying driver rejected the operation.
    Driver(String),
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "station interface not started"),
            Self::Driver(msg) => write!(f, "radio driver error: {}", msg),
        }
    }
}

impl Error for RadioError {}
