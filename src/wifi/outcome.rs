//! One-shot outcome latch for a connection attempt.
//!
//! The bootstrap waiter blocks on the latch while the event bridge
//! drives the state machine from another thread. Whichever terminal
//! signal lands first (address assigned, or retries exhausted) wins;
//! later signals for the same attempt are ignored.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Terminal result of one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// An address was assigned.
    Connected,
    /// Retries were exhausted before an address arrived.
    Failed,
    /// Neither signal arrived within the wait deadline.
    TimedOut,
}

#[derive(Debug, Default)]
struct LatchFlags {
    connected: bool,
    failed: bool,
}

/// Latch shared between the bootstrap waiter and the event bridge.
#[derive(Debug, Default)]
pub struct OutcomeLatch {
    flags: Mutex<LatchFlags>,
    signaled: Condvar,
}

impl OutcomeLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear both flags ahead of a fresh attempt.
    pub fn arm(&self) {
        let mut flags = self.flags.lock().unwrap();
        flags.connected = false;
        flags.failed = false;
    }

    /// Latch the connected outcome unless the attempt already concluded.
    pub fn signal_connected(&self) {
        let mut flags = self.flags.lock().unwrap();
        if !flags.connected && !flags.failed {
            flags.connected = true;
            self.signaled.notify_all();
        }
    }

    /// Latch the failed outcome unless the attempt already concluded.
    pub fn signal_failed(&self) {
        let mut flags = self.flags.lock().unwrap();
        if !flags.connected && !flags.failed {
            flags.failed = true;
            self.signaled.notify_all();
        }
    }

    /// Block until a signal lands or the deadline passes.
    pub fn wait(&self, timeout: Duration) -> ConnectOutcome {
        let flags = self.flags.lock().unwrap();
        let (flags, _) = self
            .signaled
            .wait_timeout_while(flags, timeout, |f| !f.connected && !f.failed)
            .unwrap();
        if flags.connected {
            ConnectOutcome::Connected
        } else if flags.failed {
            ConnectOutcome::Failed
        } else {
            ConnectOutcome::TimedOut
        }
    }
}
