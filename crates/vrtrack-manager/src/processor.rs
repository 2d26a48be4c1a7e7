//! Background processing of runtime events
//!
//! A dedicated thread drains every queued runtime event once per cycle and
//! applies the matching registry mutation, then sleeps until the next cycle
//! or until the owner signals it to stop. The loop exits on its own as soon
//! as the manager is no longer initialized (e.g. after a quit request).

use parking_lot::Mutex;
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

use vrtrack_core::RuntimeEvent;

use crate::manager::Inner;

/// Handle on the running processor thread
pub(crate) struct EventProcessor {
    handle: JoinHandle<()>,
    stop_tx: mpsc::Sender<()>,
}

impl EventProcessor {
    pub(crate) fn spawn(inner: Arc<Mutex<Inner>>, interval: Duration) -> io::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("vrtrack-events".to_string())
            .spawn(move || run(inner, interval, stop_rx))?;

        Ok(Self { handle, stop_tx })
    }

    /// Wake the thread, let it exit and wait for it
    pub(crate) fn stop_and_join(self) {
        drop(self.stop_tx);

        if self.handle.thread().id() == thread::current().id() {
            warn!("Event processor cannot join itself, detaching");
            return;
        }

        if self.handle.join().is_err() {
            error!("Event processor thread panicked");
        }
    }
}

fn run(inner: Arc<Mutex<Inner>>, interval: Duration, stop_rx: mpsc::Receiver<()>) {
    debug!("Event processor starting");

    loop {
        {
            let mut inner = inner.lock();
            if !inner.initialized() {
                break;
            }
            drain_events(&mut inner);
        }

        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("Event processor exiting");
}

/// Apply all currently queued events in delivery order. Returns how many
/// events were consumed. Must be called with the manager lock held.
pub(crate) fn drain_events(inner: &mut Inner) -> usize {
    let mut processed = 0;

    while let Some(event) = inner.poll_event() {
        processed += 1;
        debug!(event = event.name(), index = ?event.device_index(), "Received event");

        match event {
            RuntimeEvent::DeviceActivated(index) => {
                if let Err(e) = inner.add_device(index) {
                    warn!(index, error = %e, "Failed to add activated device");
                }
            }
            RuntimeEvent::DeviceDeactivated(index) => {
                if let Some(device) = inner.remove_by_index(index) {
                    debug!(serial = %device.serial_number, index, "Removed deactivated device");
                }
            }
            RuntimeEvent::DeviceUpdated(_)
            | RuntimeEvent::DeviceRoleChanged(_)
            | RuntimeEvent::UserInteractionStarted(_)
            | RuntimeEvent::UserInteractionEnded(_) => {}
            RuntimeEvent::Quit => {
                inner.handle_quit();
                // The session is gone, nothing left to poll
                break;
            }
            RuntimeEvent::Other { .. } => {}
        }
    }

    processed
}
