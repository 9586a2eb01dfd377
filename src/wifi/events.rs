//! Link-layer event plumbing.
//!
//! Radio backends report three notifications: the station interface
//! came up, the link dropped, and an address was assigned. On device
//! these arrive on the system event loop; on the host a simulated
//! radio pushes them through a channel and [`spawn_bridge`] replays
//! them on a single thread so dispatch stays serialized either way.

#[cfg(not(feature = "esp32"))]
use std::io;
#[cfg(not(feature = "esp32"))]
use std::sync::mpsc;
#[cfg(not(feature = "esp32"))]
use std::thread;

/// Notification from the link layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The station interface started; the first join may be issued.
    StationStarted,
    /// The station lost (or failed to establish) the link.
    Disconnected,
    /// The station was assigned an address.
    AddressAssigned(String),
}

/// Drain `events` on a dedicated thread, feeding each one to `handler`.
///
/// The thread exits once every sender is dropped.
#[cfg(not(feature = "esp32"))]
pub fn spawn_bridge<F>(
    events: mpsc::Receiver<LinkEvent>,
    mut handler: F,
) -> io::Result<thread::JoinHandle<()>>
where
    F: FnMut(LinkEvent) + Send + 'static,
{
    thread::Builder::new()
        .name("link-events".to_string())
        .spawn(move || {
            for event in events.iter() {
                handler(event);
            }
        })
}

#[cfg(all(test, not(feature = "esp32")))]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    // ==================== Bridge Tests ====================

    #[test]
    fn test_events_arrive_in_send_order() {
        let (tx, rx) = mpsc::channel();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let handle = spawn_bridge(rx, move |event| {
            sink.lock().unwrap().push(event);
        })
        .unwrap();

        tx.send(LinkEvent::StationStarted).unwrap();
        tx.send(LinkEvent::Disconnected).unwrap();
        tx.send(LinkEvent::AddressAssigned("10.0.0.2".to_string()))
            .unwrap();
        drop(tx);
        handle.join().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                LinkEvent::StationStarted,
                LinkEvent::Disconnected,
                LinkEvent::AddressAssigned("10.0.0.2".to_string()),
            ]
        );
    }

    #[test]
    fn test_bridge_exits_when_senders_drop() {
        let (tx, rx) = mpsc::channel();
        let handle = spawn_bridge(rx, |_| {}).unwrap();
        drop(tx);
        // join returning at all is the assertion
        handle.join().unwrap();
    }
}
