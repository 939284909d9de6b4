//! Background animation playback
//!
//! An [`AnimationPlayer`] owns one playback thread. The thread resolves the
//! animation's frames, then pushes them one at a time under the render lock,
//! sleeping `1 / fps` between frames. It checks the shared [`StopSignal`]
//! before every frame and wakes from its sleep as soon as the signal is
//! raised, so stopping takes at most one in-flight push.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, trace, warn};

use crate::frame::Frame;
use crate::signal::StopSignal;
use crate::sink::{DeviceSink, RenderLock, lock_surface};
use crate::source::FrameSource;

/// Decoded frames with a playback rate and loop flag
#[derive(Clone, Debug)]
pub struct Animation {
    name: String,
    frames: Vec<Frame>,
    fps: f32,
    looping: bool,
}

impl Animation {
    /// Create an animation
    ///
    /// Returns `None` when `frames` is empty or `fps` is not a positive number.
    pub fn new(name: &str, frames: Vec<Frame>, fps: f32, looping: bool) -> Option<Self> {
        if frames.is_empty() || !(fps.is_finite() && fps > 0.0) {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            frames,
            fps,
            looping,
        })
    }

    /// Animation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frames in playback order
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Playback rate in frames per second
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Whether playback repeats forever
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Pause between frames
    ///
    /// Rates too slow for the delay to fit in a [`Duration`] saturate to
    /// [`Duration::MAX`].
    pub fn frame_delay(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / f64::from(self.fps)).unwrap_or(Duration::MAX)
    }
}

/// What to play, as requested by the controller
#[derive(Clone, Debug)]
pub(crate) struct PlaybackRequest {
    pub(crate) name: String,
    pub(crate) fps: f32,
    pub(crate) looping: bool,
}

/// Handle to a running playback thread
///
/// Dropping the handle stops playback and joins the thread.
pub(crate) struct AnimationPlayer {
    name: String,
    signal: Arc<StopSignal>,
    thread_handle: Option<JoinHandle<()>>,
}

impl AnimationPlayer {
    /// Spawn a playback thread
    pub(crate) fn spawn<S>(
        request: PlaybackRequest,
        source: Arc<FrameSource>,
        surface: RenderLock<S>,
    ) -> io::Result<Self>
    where
        S: DeviceSink + Send + 'static,
    {
        let signal = Arc::new(StopSignal::new());
        let name = request.name.clone();
        let thread_signal = Arc::clone(&signal);

        let thread_handle = thread::Builder::new()
            .name(format!("animation-{name}"))
            .spawn(move || play(&request, &source, &surface, &thread_signal))?;

        info!("Animation '{name}' started");
        Ok(Self {
            name,
            signal,
            thread_handle: Some(thread_handle),
        })
    }

    /// Name of the animation being played
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Whether the playback thread is still alive
    pub(crate) fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Raise the stop flag and wait for the thread to exit
    pub(crate) fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.signal.stop();
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!("Animation '{}' thread panicked: {:?}", self.name, e);
            }
            debug!("Animation '{}' stopped", self.name);
        }
    }
}

impl core::fmt::Debug for AnimationPlayer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AnimationPlayer")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Drop for AnimationPlayer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Playback thread body
fn play<S: DeviceSink>(
    request: &PlaybackRequest,
    source: &FrameSource,
    surface: &RenderLock<S>,
    signal: &StopSignal,
) {
    let frames = match source.resolve_animation(&request.name) {
        Ok(frames) => frames,
        Err(err) => {
            error!("{err}");
            return;
        }
    };
    let Some(animation) = Animation::new(&request.name, frames, request.fps, request.looping)
    else {
        error!("No frames found for animation '{}'", request.name);
        return;
    };

    let delay = animation.frame_delay();
    'playback: loop {
        for (index, frame) in animation.frames().iter().enumerate() {
            if signal.is_stopped() {
                break 'playback;
            }
            let pushed = {
                let mut surface = lock_surface(surface);
                if signal.is_stopped() {
                    break 'playback;
                }
                surface.sink.push(frame)
            };
            if let Err(err) = pushed {
                error!("Error in animation '{}': {:?}", animation.name(), err);
                break 'playback;
            }
            trace!("Animation '{}' frame {}", animation.name(), index);
            if signal.wait_timeout(delay) {
                break 'playback;
            }
        }
        if !animation.is_looping() {
            break;
        }
    }
    debug!("Animation '{}' loop exiting", animation.name());
}
