//! Network mode controller and its radio backends.
//!
//! The controller owns the station/AP state machine and is driven
//! from two sides: the boot sequence calls it synchronously, and link
//! events feed it asynchronously through a serialized dispatch
//! context.
//!
//! # Components
//!
//! - [`manager`] - mode controller, bootstrap waiter, portal lifecycle
//! - [`state`] - connection state machine and retry policy
//! - [`outcome`] - latched Connected/Failed signal for one attempt
//! - [`events`] - link event type and the host dispatch bridge
//! - [`radio`] - radio backend trait
//! - `esp` - ESP-IDF backend (ESP32 only)
//! - `sim` - scripted backend for host builds and tests

pub mod events;
pub mod manager;
pub mod outcome;
pub mod radio;
pub mod state;

#[cfg(feature = "esp32")]
pub mod esp;

#[cfg(not(feature = "esp32"))]
pub mod sim;

// Re-exports
pub use events::LinkEvent;
pub use manager::{ManagerConfig, WifiError, WifiManager};
pub use outcome::ConnectOutcome;
pub use radio::{Radio, RadioError};
pub use state::Mode;
