//! Cooperative stop flag shared with background threads

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// One-way stop flag a background thread polls and sleeps on
///
/// Once stopped it stays stopped. Sleeping through [`wait_timeout`](Self::wait_timeout)
/// wakes early when the flag is raised, so stopping never waits out a full
/// frame delay or timer.
#[derive(Debug, Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    /// Create a signal in the running state
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag and wake any sleeper
    pub fn stop(&self) {
        let mut stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        *stopped = true;
        self.wake.notify_all();
    }

    /// Whether the flag has been raised
    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `timeout` unless stopped first
    ///
    /// Returns `true` if the flag was raised before the timeout elapsed. A
    /// timeout past the end of the clock waits until the flag is raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        while !*stopped {
            let Some(deadline) = deadline else {
                stopped = self.wake.wait(stopped).unwrap_or_else(PoisonError::into_inner);
                continue;
            };
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            stopped = self
                .wake
                .wait_timeout(stopped, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        *stopped
    }
}
