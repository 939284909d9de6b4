//! Device sink abstraction
//!
//! This module provides the [`DeviceSink`] trait the controller pushes frames
//! through, and [`MemorySink`], a headless sink that records what would have
//! been shown.
//!
//! Sinks do not lock internally. The [`DisplayController`](crate::DisplayController)
//! owns its sink behind the render lock and only calls it while holding that
//! lock, so implementations never see concurrent calls.
//!
//! ## Example
//!
//! ```
//! use monoplay::{DeviceSink, Dimensions, Frame, MemorySink};
//!
//! let dims = match Dimensions::new(128, 32) {
//!     Ok(dims) => dims,
//!     Err(_) => return,
//! };
//! let mut sink = MemorySink::new();
//! let probe = sink.clone();
//!
//! let _ = sink.push(&Frame::new(dims));
//! assert_eq!(probe.push_count(), 1);
//! ```

use core::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};

use crate::frame::Frame;

type SinkResult<E> = core::result::Result<(), E>;

/// Trait for the physical display a controller drives
///
/// Implement this on top of a panel driver: construct and initialize the
/// hardware when building the sink, then forward frames here.
pub trait DeviceSink {
    /// Error type for device operations
    ///
    /// Must implement [`Debug`] for error reporting.
    type Error: Debug;

    /// Send a frame to the device and make it visible
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer or refresh fails.
    fn push(&mut self, frame: &Frame) -> SinkResult<Self::Error>;

    /// Blank the device
    ///
    /// # Errors
    ///
    /// Returns an error if the bus transfer or refresh fails.
    fn clear(&mut self) -> SinkResult<Self::Error>;
}

/// Everything a [`MemorySink`] has been asked to show
#[derive(Debug, Default)]
struct Recorded {
    frames: Vec<Frame>,
    clears: usize,
    visible: Option<Frame>,
}

/// Headless sink recording pushed frames
///
/// Clones share the same record, so a clone kept by the caller observes
/// frames pushed after the original was handed to a controller.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    recorded: Arc<Mutex<Recorded>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of frames pushed so far
    pub fn push_count(&self) -> usize {
        self.recorded().frames.len()
    }

    /// Number of clears so far
    pub fn clear_count(&self) -> usize {
        self.recorded().clears
    }

    /// Most recently pushed frame
    pub fn last_frame(&self) -> Option<Frame> {
        self.recorded().frames.last().cloned()
    }

    /// Frame currently visible, `None` after a clear
    pub fn visible(&self) -> Option<Frame> {
        self.recorded().visible.clone()
    }

    /// All frames pushed so far, oldest first
    pub fn frames(&self) -> Vec<Frame> {
        self.recorded().frames.clone()
    }
}

impl DeviceSink for MemorySink {
    type Error = core::convert::Infallible;

    fn push(&mut self, frame: &Frame) -> SinkResult<Self::Error> {
        let mut recorded = self.recorded();
        recorded.frames.push(frame.clone());
        recorded.visible = Some(frame.clone());
        Ok(())
    }

    fn clear(&mut self) -> SinkResult<Self::Error> {
        let mut recorded = self.recorded();
        recorded.clears += 1;
        recorded.visible = None;
        Ok(())
    }
}

/// Canvas and device guarded together by the render lock
pub(crate) struct Surface<S> {
    /// Last frame composed by a direct draw
    pub(crate) canvas: Frame,
    /// Physical display
    pub(crate) sink: S,
}

/// Shared render lock handed to the animation thread
pub(crate) type RenderLock<S> = Arc<Mutex<Surface<S>>>;

/// Acquire the render lock, recovering it if a holder panicked
pub(crate) fn lock_surface<S>(
    lock: &Mutex<Surface<S>>,
) -> std::sync::MutexGuard<'_, Surface<S>> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}
