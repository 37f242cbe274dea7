//! Reservation watchdog
//!
//! Background thread that releases a push reservation once it has been held
//! longer than the controller's reservation timeout, so a publisher that died
//! between START and FINISH does not block pushes forever. Expiry is also
//! checked at the start of every push command; the watchdog only makes the
//! release happen without waiting for the next command.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::controller::PushController;

/// Configuration for the watchdog
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// How often the reservation age is checked (default: 5s)
    pub interval: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
        }
    }
}

/// Periodic auto-OVERRIDE for stale reservations
pub struct ReservationWatchdog {
    config: WatchdogConfig,
    running: Arc<AtomicBool>,
}

impl ReservationWatchdog {
    pub fn new(config: WatchdogConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the watchdog thread.
    ///
    /// Returns `None` when the controller has no reservation timeout, since
    /// there is nothing to watch.
    pub fn start(&self, controller: Arc<PushController>) -> Option<WatchdogHandle> {
        let timeout = controller.reservation_timeout()?;

        if self.running.swap(true, Ordering::SeqCst) {
            return Some(WatchdogHandle {
                running: Arc::clone(&self.running),
            });
        }

        let running = Arc::clone(&self.running);
        let interval = self.config.interval;
        tracing::info!(
            op = "watchdog.start",
            timeout_secs = timeout.as_secs(),
            interval_ms = interval.as_millis() as u64,
            "Reservation watchdog started"
        );

        thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                thread::sleep(interval);
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                controller.expire_stale_reservation();
            }
            tracing::debug!(op = "watchdog.stop", "Reservation watchdog stopped");
        });

        Some(WatchdogHandle {
            running: Arc::clone(&self.running),
        })
    }
}

/// Handle for controlling a running watchdog
pub struct WatchdogHandle {
    running: Arc<AtomicBool>,
}

impl WatchdogHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
