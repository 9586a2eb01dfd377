//! Restart plumbing.
//!
//! The portal validates provisioning by restarting the whole process:
//! the boot sequence re-runs, loads the freshly saved credentials, and
//! either connects or falls back to provisioning mode. Handlers
//! schedule the restart with a short delay so the HTTP response can
//! flush first.

use std::time::Duration;

/// Schedules a full process restart.
pub trait Reboot: Send + Sync {
    /// Arrange a restart after `delay`; returns immediately.
    fn schedule_restart(&self, delay: Duration);
}

/// Chip reset via the IDF.
#[cfg(feature = "esp32")]
#[derive(Debug, Default)]
pub struct EspReboot;

#[cfg(feature = "esp32")]
impl Reboot for EspReboot {
    fn schedule_restart(&self, delay: Duration) {
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            log::warn!("restarting now");
            unsafe {
                esp_idf_svc::sys::esp_restart();
            }
        });
    }
}

/// Host stand-in: exits the process and lets whatever launched it
/// start a fresh one.
#[cfg(not(feature = "esp32"))]
#[derive(Debug, Default)]
pub struct HostReboot;

#[cfg(not(feature = "esp32"))]
impl Reboot for HostReboot {
    fn schedule_restart(&self, delay: Duration) {
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            log::warn!("restarting now");
            std::process::exit(0);
        });
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Condvar, Mutex};

    /// Records restart requests instead of acting on them.
    #[derive(Debug, Default)]
    pub struct RecordingReboot {
        requests: Mutex<Vec<Duration>>,
        requested: Condvar,
    }

    impl RecordingReboot {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn restart_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn last_delay(&self) -> Option<Duration> {
            self.requests.lock().unwrap().last().copied()
        }

        /// Block until at least one restart was requested.
        pub fn wait_for_restart(&self, timeout: Duration) -> bool {
            let requests = self.requests.lock().unwrap();
            let (requests, _) = self
                .requested
                .wait_timeout_while(requests, timeout, |r| r.is_empty())
                .unwrap();
            !requests.is_empty()
        }
    }

    impl Reboot for RecordingReboot {
        fn schedule_restart(&self, delay: Duration) {
            self.requests.lock().unwrap().push(delay);
            self.requested.notify_all();
        }
    }

    // ==================== Recording Reboot Tests ====================

    #[test]
    fn test_recording_reboot_captures_requests() {
        let reboot = RecordingReboot::new();
        assert_eq!(reboot.restart_count(), 0);
        assert!(!reboot.wait_for_restart(Duration::from_millis(10)));

        reboot.schedule_restart(Duration::from_secs(1));
        assert_eq!(reboot.restart_count(), 1);
        assert_eq!(reboot.last_delay(), Some(Duration::from_secs(1)));
        assert!(reboot.wait_for_restart(Duration::from_millis(10)));
    }
}
