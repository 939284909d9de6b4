//! Monochrome Display Playback Controller
//!
//! Drives a small monochrome display (such as a 128x32 OLED) with frame
//! animations, centered text messages, still icons and an idle animation.
//!
//! ## Features
//!
//! - Background animation playback with prompt, joined stops
//! - At most one rendering activity at a time
//! - Timed messages that return to the idle animation or blank the screen
//! - Per-user asset overrides on top of bundled assets
//! - `embedded-graphics` integration for the frame buffer
//! - Device access through the [`DeviceSink`] trait
//!
//! ## Usage
//!
//! ```rust,no_run
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
//!
//! let sink = MemorySink::new();
//! let display = DisplayController::new(sink.clone(), config);
//!
//! let _ = display.play_animation("idle", true, 2.0);
//! let _ = display.display_message("Hello", Duration::from_secs(2), true);
//! let _ = display.display_static_image("check");
//! let _ = display.clear();
//! ```

/// Animation values and the playback thread
pub mod animation;
/// RGB to monochrome conversion
pub mod color;
/// Controller configuration types and builder
pub mod config;
/// Display controller coordinating rendering activities
pub mod controller;
/// Error types
pub mod error;
/// Packed monochrome frame buffer
pub mod frame;
/// Centering and text composition
pub mod graphics;
/// Stop flag with interruptible waits
pub mod signal;
/// Device sink abstraction
pub mod sink;
/// Asset lookup and decoding
pub mod source;
/// Deferred one-shot actions
pub mod timer;

#[cfg(test)]
mod test_support;

pub use animation::Animation;
pub use color::Polarity;
pub use config::{
    ASSET_DIR_ENV, Builder, Config, DEFAULT_FPS, DEFAULT_IDLE_ANIMATION, DEFAULT_IDLE_FPS,
    Dimensions,
};
pub use controller::{DisplayController, DisplayState};
pub use error::{AssetError, AssetKind, BuilderError, Error};
pub use frame::Frame;
pub use sink::{DeviceSink, MemorySink};
pub use source::{AssetDir, AssetResolver, FrameSource};
pub use timer::DeferredKind;
