//! Display controller: exclusive rendering activity and deferred actions
//!
//! The [`DisplayController`] serializes every public operation behind a
//! coordinator lock. Each operation first tears down whatever is running
//! (joining the animation thread and cancelling any deferred action), then
//! draws or launches its own activity, then optionally arms a new deferred
//! action.
//!
//! Two locks are involved and always taken in the same order:
//!
//! 1. the coordinator lock, held for the whole public operation;
//! 2. the render lock, held only around canvas composition and sink pushes.
//!
//! The animation thread only ever takes the render lock, so the coordinator
//! can join it while holding the coordinator lock.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use monoplay::{Builder, Dimensions, DisplayController, MemorySink};
//!
//! let dims = match Dimensions::new(128, 32) {
//!     Ok(dims) => dims,
//!     Err(_) => return,
//! };
//! let config = match Builder::new().dimensions(dims).build() {
//!     Ok(config) => config,
//!     Err(_) => return,
//! };
//! let display = DisplayController::new(MemorySink::new(), config);
//!
//! let _ = display.display_idle();
//! // Show a message for three seconds, then go back to the idle animation
//! let _ = display.display_message("Connected", Duration::from_secs(3), true);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use embedded_graphics_core::pixelcolor::BinaryColor;
use log::{debug, error, info};

use crate::animation::{AnimationPlayer, PlaybackRequest};
use crate::config::Config;
use crate::error::Error;
use crate::frame::Frame;
use crate::graphics::draw_message;
use crate::sink::{DeviceSink, RenderLock, Surface, lock_surface};
use crate::source::{FrameSource, validate_asset_name};
use crate::timer::{DeferredAction, DeferredKind};

type OpResult<S> = core::result::Result<(), Error<<S as DeviceSink>::Error>>;

/// What the display is currently showing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DisplayState {
    /// Nothing running: blank, or the last frame of a finished animation
    #[default]
    Idle,
    /// An animation thread is playing
    Animating,
    /// A text message was drawn
    MessageShown,
    /// A still image was drawn
    ImageShown,
}

/// State only touched under the coordinator lock
#[derive(Debug, Default)]
struct Coordinator {
    activity: Option<AnimationPlayer>,
    deferred: Option<DeferredAction>,
    shown: DisplayState,
    next_deferred_id: u64,
}

impl Coordinator {
    fn is_animating(&self) -> bool {
        self.activity.as_ref().is_some_and(AnimationPlayer::is_running)
    }

    fn state(&self) -> DisplayState {
        match self.shown {
            DisplayState::Animating if !self.is_animating() => DisplayState::Idle,
            shown => shown,
        }
    }
}

struct Inner<S> {
    config: Config,
    source: Arc<FrameSource>,
    surface: RenderLock<S>,
    coordinator: Mutex<Coordinator>,
}

/// Controller driving one monochrome display
///
/// Cheap to clone; clones share the same display. Dropping the last clone
/// stops any animation and cancels any pending deferred action.
pub struct DisplayController<S: DeviceSink> {
    inner: Arc<Inner<S>>,
}

impl<S: DeviceSink> Clone for DisplayController<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> DisplayController<S>
where
    S: DeviceSink + Send + 'static,
{
    /// Create a controller searching the configured asset roots
    pub fn new(sink: S, config: Config) -> Self {
        let source = FrameSource::from_config(&config);
        Self::with_source(sink, config, source)
    }

    /// Create a controller with a custom frame source
    pub fn with_source(sink: S, config: Config, source: FrameSource) -> Self {
        let surface = Surface {
            canvas: Frame::new(config.dimensions),
            sink,
        };
        Self {
            inner: Arc::new(Inner {
                config,
                source: Arc::new(source),
                surface: Arc::new(Mutex::new(surface)),
                coordinator: Mutex::new(Coordinator::default()),
            }),
        }
    }

    /// Controller configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Play an animation on a background thread
    ///
    /// Returns as soon as the thread is started. A missing animation is
    /// reported from the playback thread and leaves the controller idle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an empty or path-like name or a
    /// non-positive `fps`, before anything is stopped.
    pub fn play_animation(&self, name: &str, looping: bool, fps: f32) -> OpResult<S> {
        validate_asset_name(name).map_err(Error::InvalidArgument)?;
        if !(fps.is_finite() && fps > 0.0) {
            return Err(Error::InvalidArgument("fps must be a positive number"));
        }
        let mut coordinator = self.inner.lock_coordinator();
        self.inner.play_locked(&mut coordinator, name, looping, fps)
    }

    /// Show a centered text message
    ///
    /// With a non-zero `duration`, the idle animation (`return_to_idle`) or a
    /// blank screen follows once it elapses, unless another operation comes
    /// first.
    pub fn display_message(
        &self,
        text: &str,
        duration: Duration,
        return_to_idle: bool,
    ) -> OpResult<S> {
        let mut coordinator = self.inner.lock_coordinator();
        Inner::<S>::halt(&mut coordinator);

        {
            let mut surface = lock_surface(&self.inner.surface);
            let Surface { canvas, sink } = &mut *surface;
            draw_message(canvas, text, self.inner.config.font);
            sink.push(canvas).map_err(|err| {
                error!("Error displaying message '{text}': {err:?}");
                Error::Device(err)
            })?;
        }
        coordinator.shown = DisplayState::MessageShown;
        debug!("Message '{text}' shown");

        if !duration.is_zero() {
            let kind = if return_to_idle {
                DeferredKind::Idle
            } else {
                DeferredKind::Clear
            };
            Inner::arm(&self.inner, &mut coordinator, kind, duration)?;
        }
        Ok(())
    }

    /// Show a still image from the icon directories
    ///
    /// # Errors
    ///
    /// Returns [`Error::Asset`] when the image is missing or unreadable; the
    /// display keeps whatever it was showing.
    pub fn display_static_image(&self, name: &str) -> OpResult<S> {
        validate_asset_name(name).map_err(Error::InvalidArgument)?;
        let mut coordinator = self.inner.lock_coordinator();
        Inner::<S>::halt(&mut coordinator);

        let frame = self.inner.source.resolve_still(name).map_err(|err| {
            error!("{err}");
            Error::Asset(err)
        })?;

        {
            let mut surface = lock_surface(&self.inner.surface);
            surface.sink.push(&frame).map_err(|err| {
                error!("Error displaying image '{name}': {err:?}");
                Error::Device(err)
            })?;
            surface.canvas = frame;
        }
        coordinator.shown = DisplayState::ImageShown;
        debug!("Image '{name}' shown");
        Ok(())
    }

    /// Loop the configured idle animation
    pub fn display_idle(&self) -> OpResult<S> {
        let mut coordinator = self.inner.lock_coordinator();
        self.inner.idle_locked(&mut coordinator)
    }

    /// Stop everything and blank the display
    pub fn clear(&self) -> OpResult<S> {
        let mut coordinator = self.inner.lock_coordinator();
        self.inner.clear_locked(&mut coordinator)
    }

    /// Stop the running animation, waiting for its thread to exit
    ///
    /// No-op when nothing is playing. Pending deferred actions are left armed.
    pub fn stop_animation(&self) {
        let mut coordinator = self.inner.lock_coordinator();
        Inner::<S>::stop_locked(&mut coordinator);
    }

    /// What the display is currently showing
    pub fn state(&self) -> DisplayState {
        self.inner.lock_coordinator().state()
    }

    /// Whether an animation thread is alive
    pub fn is_animating(&self) -> bool {
        self.inner.lock_coordinator().is_animating()
    }

    /// Whether a deferred idle/clear is armed
    pub fn has_pending_deferred(&self) -> bool {
        self.inner.lock_coordinator().deferred.is_some()
    }

    /// Inspect the device under the render lock
    ///
    /// `f` must not call back into the controller: every operation takes the
    /// coordinator lock before the render lock, so doing so deadlocks.
    pub fn with_sink<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&lock_surface(&self.inner.surface).sink)
    }
}

impl<S> Inner<S>
where
    S: DeviceSink + Send + 'static,
{
    fn lock_coordinator(&self) -> MutexGuard<'_, Coordinator> {
        self.coordinator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn stop_locked(coordinator: &mut Coordinator) {
        if let Some(player) = coordinator.activity.take() {
            info!("Stopping animation '{}'", player.name());
            player.stop();
        }
    }

    /// Stop the animation and cancel the pending deferred action
    fn halt(coordinator: &mut Coordinator) {
        Self::stop_locked(coordinator);
        if let Some(action) = coordinator.deferred.take() {
            debug!("Cancelling deferred {} #{}", action.kind(), action.id());
            action.cancel();
        }
    }

    fn play_locked(
        &self,
        coordinator: &mut Coordinator,
        name: &str,
        looping: bool,
        fps: f32,
    ) -> OpResult<S> {
        Self::halt(coordinator);

        let request = PlaybackRequest {
            name: name.to_string(),
            fps,
            looping,
        };
        let source = Arc::clone(&self.source);
        let surface = Arc::clone(&self.surface);
        let player = AnimationPlayer::spawn(request, source, surface).map_err(|err| {
            error!("Failed to start animation '{name}': {err}");
            Error::Spawn(err)
        })?;
        coordinator.activity = Some(player);
        coordinator.shown = DisplayState::Animating;
        Ok(())
    }

    fn idle_locked(&self, coordinator: &mut Coordinator) -> OpResult<S> {
        let name = self.config.idle_animation.clone();
        self.play_locked(coordinator, &name, true, self.config.idle_fps)
    }

    fn clear_locked(&self, coordinator: &mut Coordinator) -> OpResult<S> {
        Self::halt(coordinator);

        {
            let mut surface = lock_surface(&self.surface);
            surface.canvas.fill(BinaryColor::Off);
            surface.sink.clear().map_err(|err| {
                error!("Error clearing display: {err:?}");
                Error::Device(err)
            })?;
        }
        coordinator.shown = DisplayState::Idle;
        Ok(())
    }

    /// Arm a deferred action, replacing any already armed
    fn arm(
        this: &Arc<Self>,
        coordinator: &mut Coordinator,
        kind: DeferredKind,
        delay: Duration,
    ) -> OpResult<S> {
        if let Some(previous) = coordinator.deferred.take() {
            previous.cancel();
        }

        coordinator.next_deferred_id += 1;
        let id = coordinator.next_deferred_id;
        let weak: Weak<Self> = Arc::downgrade(this);
        let action = DeferredAction::arm(id, kind, delay, move |id| {
            if let Some(inner) = weak.upgrade() {
                inner.fire_deferred(id);
            }
        })
        .map_err(|err| {
            error!("Failed to arm deferred {kind}: {err}");
            Error::Spawn(err)
        })?;
        coordinator.deferred = Some(action);
        Ok(())
    }

    /// Run a deferred action if it is still the one armed
    fn fire_deferred(&self, id: u64) {
        let mut coordinator = self.lock_coordinator();
        let Some(action) = coordinator.deferred.take_if(|action| action.id() == id) else {
            debug!("Deferred action #{id} was replaced before firing");
            return;
        };
        let kind = action.kind();
        drop(action);

        info!("Deferred {kind} firing");
        let result = match kind {
            DeferredKind::Idle => self.idle_locked(&mut coordinator),
            DeferredKind::Clear => self.clear_locked(&mut coordinator),
        };
        if let Err(err) = result {
            error!("Deferred {kind} failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Builder, Dimensions};
    use crate::sink::MemorySink;
    use crate::test_support::{AssetTree, checker, solid};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Instant;
    use test_log::test;

    fn dims() -> Dimensions {
        Dimensions::new(32, 16).unwrap()
    }

    fn config(tree: &AssetTree) -> Config {
        Builder::new()
            .dimensions(dims())
            .user_root(tree.root("user"))
            .bundled_root(tree.root("bundled"))
            .build()
            .unwrap()
    }

    /// Tree with a distinguishable frame per animation
    fn tree() -> AssetTree {
        let tree = AssetTree::new();
        // idle: two frames of 2x2 and 4x4 lit squares
        tree.frame("bundled", "idle", "0.bmp", 2, 2, solid(true));
        tree.frame("bundled", "idle", "1.bmp", 4, 4, solid(true));
        tree.frame("user", "fast", "0.bmp", 6, 6, solid(true));
        tree.frame("user", "fast", "1.bmp", 8, 8, solid(true));
        tree.frame("user", "once", "0.bmp", 10, 10, solid(true));
        tree.icon("bundled", "check", 4, 4, checker());
        tree
    }

    fn controller(tree: &AssetTree) -> (DisplayController<MemorySink>, MemorySink) {
        let sink = MemorySink::new();
        (DisplayController::new(sink.clone(), config(tree)), sink)
    }

    fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        done()
    }

    fn lit(frame: Option<Frame>) -> u32 {
        frame.map_or(0, |frame| frame.lit_pixels())
    }

    #[test]
    fn test_play_animation_returns_immediately_and_pushes() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.play_animation("fast", true, 100.0).unwrap();
        assert_eq!(display.state(), DisplayState::Animating);
        assert!(wait_until(Duration::from_secs(5), || sink.push_count() >= 4));
        assert!(display.is_animating());

        display.stop_animation();
        assert!(!display.is_animating());
        assert_eq!(display.state(), DisplayState::Idle);
    }

    #[test]
    fn test_invalid_arguments_rejected_before_state_changes() {
        let tree = tree();
        let (display, sink) = controller(&tree);
        display.play_animation("fast", true, 100.0).unwrap();

        for fps in [0.0, -2.0, f32::NAN] {
            assert!(matches!(
                display.play_animation("fast", true, fps),
                Err(Error::InvalidArgument(_))
            ));
        }
        assert!(matches!(
            display.play_animation("", true, 2.0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            display.display_static_image("../secret"),
            Err(Error::InvalidArgument(_))
        ));

        // The running animation is untouched.
        assert!(display.is_animating());
        let before = sink.push_count();
        assert!(wait_until(Duration::from_secs(5), || sink.push_count() > before));
    }

    #[test]
    fn test_stop_animation_is_idempotent() {
        let tree = tree();
        let (display, _sink) = controller(&tree);

        display.stop_animation();
        display.stop_animation();
        assert!(!display.is_animating());

        display.play_animation("fast", true, 50.0).unwrap();
        display.stop_animation();
        display.stop_animation();
        assert!(!display.is_animating());
    }

    #[test]
    fn test_no_pushes_after_stop_returns() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.play_animation("fast", true, 200.0).unwrap();
        assert!(wait_until(Duration::from_secs(5), || sink.push_count() >= 3));
        display.stop_animation();

        let settled = sink.push_count();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(sink.push_count(), settled);
    }

    #[test]
    fn test_switching_animation_never_interleaves_frames() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.play_animation("fast", true, 200.0).unwrap();
        assert!(wait_until(Duration::from_secs(5), || sink.push_count() >= 2));
        display.display_idle().unwrap();
        let switched_at = sink.push_count();
        assert!(wait_until(Duration::from_secs(5), || {
            sink.push_count() >= switched_at + 1
        }));
        display.stop_animation();

        // Everything pushed after the switch comes from the idle animation.
        for frame in &sink.frames()[switched_at..] {
            assert!(matches!(frame.lit_pixels(), 4 | 16), "{frame:?}");
        }
    }

    #[test]
    fn test_one_shot_animation_finishes_idle() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.play_animation("once", false, 100.0).unwrap();
        assert!(wait_until(Duration::from_secs(5), || !display.is_animating()));
        assert_eq!(sink.push_count(), 1);
        assert_eq!(display.state(), DisplayState::Idle);
        assert_eq!(lit(sink.visible()), 100);
    }

    #[test]
    fn test_missing_animation_is_non_fatal() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.play_animation("ghost", true, 10.0).unwrap();
        assert!(wait_until(Duration::from_secs(5), || !display.is_animating()));
        assert_eq!(display.state(), DisplayState::Idle);
        assert_eq!(sink.push_count(), 0);

        display.display_message("still here", Duration::ZERO, true).unwrap();
        assert_eq!(sink.push_count(), 1);
    }

    #[test]
    fn test_message_without_duration_arms_nothing() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.display_message("X", Duration::ZERO, true).unwrap();
        assert!(!display.has_pending_deferred());
        assert_eq!(display.state(), DisplayState::MessageShown);
        assert!(lit(sink.visible()) > 0);
    }

    #[test]
    fn test_message_stops_animation() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.play_animation("fast", true, 200.0).unwrap();
        assert!(wait_until(Duration::from_secs(5), || sink.push_count() >= 2));
        display.display_message("OK", Duration::ZERO, true).unwrap();

        assert!(!display.is_animating());
        let message = sink.last_frame().unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(sink.last_frame(), Some(message));
    }

    #[test]
    fn test_message_returns_to_idle_after_duration() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.display_idle().unwrap();
        display.display_message("OK", Duration::from_millis(100), true).unwrap();
        assert!(display.has_pending_deferred());
        assert_eq!(display.state(), DisplayState::MessageShown);

        thread::sleep(Duration::from_millis(400));
        assert!(!display.has_pending_deferred());
        assert_eq!(display.state(), DisplayState::Animating);
        assert!(wait_until(Duration::from_secs(5), || {
            matches!(lit(sink.visible()), 4 | 16)
        }));
    }

    #[test]
    fn test_message_clears_after_duration() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.display_message("bye", Duration::from_millis(50), false).unwrap();
        assert!(wait_until(Duration::from_secs(5), || sink.clear_count() == 1));
        assert_eq!(sink.visible(), None);
        assert_eq!(display.state(), DisplayState::Idle);
        assert!(!display.has_pending_deferred());
    }

    #[test]
    fn test_new_operation_cancels_deferred() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.display_message("first", Duration::from_millis(100), false).unwrap();
        display.display_static_image("check").unwrap();
        assert!(!display.has_pending_deferred());

        thread::sleep(Duration::from_millis(300));
        assert_eq!(sink.clear_count(), 0);
        assert_eq!(display.state(), DisplayState::ImageShown);
    }

    #[test]
    fn test_rearming_replaces_previous_deferred() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.display_message("one", Duration::from_millis(100), false).unwrap();
        display.display_message("two", Duration::from_millis(400), true).unwrap();

        thread::sleep(Duration::from_millis(250));
        assert_eq!(sink.clear_count(), 0);
        assert_eq!(display.state(), DisplayState::MessageShown);
        assert!(wait_until(Duration::from_secs(5), || {
            display.state() == DisplayState::Animating
        }));
        assert_eq!(sink.clear_count(), 0);
    }

    #[test]
    fn test_static_image_is_inverted_and_centered() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.display_static_image("check").unwrap();
        let frame = sink.visible().unwrap();
        assert_eq!(frame.dimensions(), dims());
        assert_eq!(frame.lit_pixels(), 8);
        assert_eq!(frame.pixel(14, 6), Some(BinaryColor::Off));
        assert_eq!(frame.pixel(15, 6), Some(BinaryColor::On));
    }

    #[test]
    fn test_missing_static_image_leaves_display_unchanged() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.display_message("keep", Duration::ZERO, true).unwrap();
        let shown = sink.visible();
        let pushes = sink.push_count();

        let result = display.display_static_image("missing");
        assert!(matches!(result, Err(Error::Asset(err)) if err.is_not_found()));
        assert_eq!(sink.push_count(), pushes);
        assert_eq!(sink.visible(), shown);
        assert_eq!(display.state(), DisplayState::MessageShown);
    }

    #[test]
    fn test_clear_blanks_and_cancels() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.play_animation("fast", true, 100.0).unwrap();
        display.display_message("later", Duration::from_millis(50), true).unwrap();
        display.clear().unwrap();

        assert!(!display.is_animating());
        assert!(!display.has_pending_deferred());
        assert_eq!(sink.visible(), None);
        thread::sleep(Duration::from_millis(200));
        assert!(!display.is_animating());
        assert_eq!(display.state(), DisplayState::Idle);
    }

    #[test]
    fn test_idle_then_message_scenario() {
        let tree = tree();
        let sink = MemorySink::new();
        let config = Builder::new()
            .dimensions(dims())
            .user_root(tree.root("user"))
            .bundled_root(tree.root("bundled"))
            .idle_fps(20.0)
            .build()
            .unwrap();
        let display = DisplayController::new(sink.clone(), config);

        display.play_animation("idle", true, 20.0).unwrap();
        display.display_message("OK", Duration::from_millis(200), true).unwrap();
        assert!(wait_until(Duration::from_secs(5), || {
            display.state() == DisplayState::Animating
        }));
        assert!(wait_until(Duration::from_secs(5), || {
            matches!(lit(sink.visible()), 4 | 16)
        }));
    }

    #[test]
    fn test_dropping_controller_stops_everything() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.play_animation("fast", true, 200.0).unwrap();
        display.display_message("bye", Duration::from_millis(50), false).unwrap();
        display.play_animation("fast", true, 200.0).unwrap();
        assert!(wait_until(Duration::from_secs(5), || sink.push_count() >= 3));
        drop(display);

        let settled = sink.push_count();
        thread::sleep(Duration::from_millis(150));
        assert_eq!(sink.push_count(), settled);
        assert_eq!(sink.clear_count(), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let tree = tree();
        let (display, _sink) = controller(&tree);
        let other = display.clone();

        display.play_animation("fast", true, 100.0).unwrap();
        assert!(other.is_animating());
        other.stop_animation();
        assert!(!display.is_animating());
    }

    #[test]
    fn test_accessors_expose_config_and_sink() {
        let tree = tree();
        let (display, _sink) = controller(&tree);

        assert_eq!(display.config().dimensions, dims());
        assert_eq!(display.config().idle_animation, "idle");
        display.display_static_image("check").unwrap();
        assert_eq!(display.with_sink(MemorySink::push_count), 1);
    }

    #[test]
    fn test_failed_image_push_keeps_previous_canvas() {
        let tree = tree();
        let sink = FlakySink {
            ok: 1,
            pushes: Arc::new(AtomicUsize::new(0)),
        };
        let display = DisplayController::new(sink, config(&tree));

        display.display_message("OK", Duration::ZERO, true).unwrap();
        let message = lock_surface(&display.inner.surface).canvas.clone();
        assert!(!message.is_blank());

        assert!(matches!(
            display.display_static_image("check"),
            Err(Error::Device(BusError))
        ));
        assert_eq!(lock_surface(&display.inner.surface).canvas, message);
        assert_eq!(display.state(), DisplayState::MessageShown);
    }

    #[test]
    fn test_unbounded_message_duration_stays_armed_until_cancelled() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.display_message("forever", Duration::MAX, false).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(display.has_pending_deferred());
        assert_eq!(display.state(), DisplayState::MessageShown);

        display.clear().unwrap();
        assert!(!display.has_pending_deferred());
        assert_eq!(sink.clear_count(), 1);
    }

    #[test]
    fn test_tiny_fps_is_accepted_and_stoppable() {
        let tree = tree();
        let (display, sink) = controller(&tree);

        display.play_animation("fast", true, 1e-30).unwrap();
        assert!(wait_until(Duration::from_secs(5), || sink.push_count() == 1));
        assert!(display.is_animating());
        display.stop_animation();
        assert!(!display.is_animating());
        assert_eq!(sink.push_count(), 1);
    }

    /// Sink that fails every push after the first `ok` ones
    struct FlakySink {
        ok: usize,
        pushes: Arc<AtomicUsize>,
    }

    #[derive(Debug)]
    struct BusError;

    impl DeviceSink for FlakySink {
        type Error = BusError;

        fn push(&mut self, _frame: &Frame) -> Result<(), Self::Error> {
            let n = self.pushes.fetch_add(1, Ordering::SeqCst);
            if n < self.ok { Ok(()) } else { Err(BusError) }
        }

        fn clear(&mut self) -> Result<(), Self::Error> {
            Err(BusError)
        }
    }

    #[test]
    fn test_device_error_aborts_animation_but_not_controller() {
        let tree = tree();
        let pushes = Arc::new(AtomicUsize::new(0));
        let sink = FlakySink {
            ok: 2,
            pushes: Arc::clone(&pushes),
        };
        let display = DisplayController::new(sink, config(&tree));

        display.play_animation("fast", true, 200.0).unwrap();
        assert!(wait_until(Duration::from_secs(5), || !display.is_animating()));
        assert_eq!(pushes.load(Ordering::SeqCst), 3);

        assert!(matches!(
            display.display_message("x", Duration::ZERO, true),
            Err(Error::Device(BusError))
        ));
        assert!(matches!(display.clear(), Err(Error::Device(BusError))));
        display.play_animation("fast", true, 200.0).unwrap();
        display.stop_animation();
    }

    /// Sink that records the highest number of overlapping pushes
    struct OverlapSink {
        in_flight: Arc<AtomicUsize>,
        max_seen: Arc<AtomicUsize>,
    }

    impl DeviceSink for OverlapSink {
        type Error = core::convert::Infallible;

        fn push(&mut self, _frame: &Frame) -> Result<(), Self::Error> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }

        fn clear(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn test_operation_storm_never_overlaps_pushes() {
        let tree = tree();
        let max_seen = Arc::new(AtomicUsize::new(0));
        let sink = OverlapSink {
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_seen: Arc::clone(&max_seen),
        };
        let display = DisplayController::new(sink, config(&tree));

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let display = display.clone();
                thread::spawn(move || {
                    for step in 0..20 {
                        let _ = match (worker + step) % 5 {
                            0 => display.play_animation("fast", true, 500.0),
                            1 => display.display_message("hi", Duration::from_millis(3), true),
                            2 => display.display_static_image("check"),
                            3 => display.display_idle(),
                            _ => display.clear(),
                        };
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        display.stop_animation();
        display.clear().unwrap();

        assert!(!display.is_animating());
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
