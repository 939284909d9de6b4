//! Cancellable one-shot deferred actions

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::trace;

use crate::signal::StopSignal;

/// Follow-up operation run when a deferred action fires
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeferredKind {
    /// Start the idle animation
    Idle,
    /// Blank the display
    Clear,
}

impl fmt::Display for DeferredKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Clear => write!(f, "clear"),
        }
    }
}

/// Handle to an armed deferred action
///
/// The timer sleeps on its own thread and calls `fire` with the action's id
/// once the delay has elapsed. Dropping or cancelling the handle wakes the
/// timer thread, which then exits without firing. The fired callback must
/// still confirm, under the caller's own lock, that the id it receives is the
/// action currently armed: a timer that expired just before being cancelled
/// may already be waiting for that lock.
pub(crate) struct DeferredAction {
    id: u64,
    kind: DeferredKind,
    signal: Arc<StopSignal>,
}

impl DeferredAction {
    /// Arm a timer that calls `fire(id)` after `delay`
    pub(crate) fn arm<F>(id: u64, kind: DeferredKind, delay: Duration, fire: F) -> io::Result<Self>
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let signal = Arc::new(StopSignal::new());
        let sleeper = Arc::clone(&signal);

        thread::Builder::new()
            .name(format!("deferred-{kind}"))
            .spawn(move || {
                if sleeper.wait_timeout(delay) {
                    trace!("Deferred {kind} #{id} cancelled");
                    return;
                }
                trace!("Deferred {kind} #{id} firing");
                fire(id);
            })?;

        trace!("Deferred {kind} #{id} armed for {delay:?}");
        Ok(Self { id, kind, signal })
    }

    /// Identifier passed to the callback
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Operation this action performs
    pub(crate) fn kind(&self) -> DeferredKind {
        self.kind
    }

    /// Prevent the action from firing
    pub(crate) fn cancel(self) {
        drop(self);
    }
}

impl Drop for DeferredAction {
    fn drop(&mut self) {
        self.signal.stop();
    }
}

impl fmt::Debug for DeferredAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredAction")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("cancelled", &self.signal.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_fires_after_delay_with_id() {
        let (tx, rx) = mpsc::channel();
        let action = DeferredAction::arm(7, DeferredKind::Idle, Duration::from_millis(20), move |id| {
            let _ = tx.send(id);
        })
        .unwrap();

        assert_eq!(action.id(), 7);
        assert_eq!(action.kind(), DeferredKind::Idle);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(7));
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let (tx, rx) = mpsc::channel();
        let action = DeferredAction::arm(1, DeferredKind::Clear, Duration::from_millis(100), move |id| {
            let _ = tx.send(id);
        })
        .unwrap();

        action.cancel();
        // The sender is dropped with the exiting timer thread.
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(DeferredKind::Idle.to_string(), "idle");
        assert_eq!(DeferredKind::Clear.to_string(), "clear");
    }
}
