//! Controller configuration types and builder

use std::path::PathBuf;

use embedded_graphics::mono_font::{MonoFont, ascii::FONT_6X10};

pub use crate::error::BuilderError;
use crate::source::validate_asset_name;

/// Environment variable overriding the user asset root
pub const ASSET_DIR_ENV: &str = "MONOPLAY_ASSET_DIR";

/// Name of the per-user asset directory under `$HOME`
pub const USER_DIR_NAME: &str = ".monoplay";

/// Animation played by [`display_idle`](crate::DisplayController::display_idle)
pub const DEFAULT_IDLE_ANIMATION: &str = "idle";

/// Frame rate of the idle animation
pub const DEFAULT_IDLE_FPS: f32 = 2.0;

/// Frame rate used by callers that do not pick one
pub const DEFAULT_FPS: f32 = 10.0;

/// Display dimensions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions with validation
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::InvalidDimensions` if either side is zero.
    pub fn new(width: u32, height: u32) -> Result<Self, BuilderError> {
        if width == 0 || height == 0 {
            return Err(BuilderError::InvalidDimensions { width, height });
        }
        Ok(Self { width, height })
    }

    /// Bytes per packed row (one bit per pixel, rows padded to a byte)
    pub fn stride(&self) -> usize {
        self.width.div_ceil(8) as usize
    }

    /// Calculate required buffer size in bytes
    pub fn buffer_size(&self) -> usize {
        self.stride() * self.height as usize
    }
}

/// Controller configuration
///
/// Use [`Builder`] to create a Config.
#[derive(Clone)]
pub struct Config {
    /// Display dimensions
    pub dimensions: Dimensions,
    /// Per-user override root, searched first
    pub user_root: Option<PathBuf>,
    /// Root shipped with the software, searched second
    pub bundled_root: PathBuf,
    /// Animation played when going idle
    pub idle_animation: String,
    /// Idle animation rate in frames per second
    pub idle_fps: f32,
    /// Font used for messages
    pub font: &'static MonoFont<'static>,
}

impl core::fmt::Debug for Config {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Config")
            .field("dimensions", &self.dimensions)
            .field("user_root", &self.user_root)
            .field("bundled_root", &self.bundled_root)
            .field("idle_animation", &self.idle_animation)
            .field("idle_fps", &self.idle_fps)
            .field("font", &self.font.character_size)
            .finish()
    }
}

impl Config {
    /// Asset roots in lookup order
    pub fn asset_roots(&self) -> Vec<PathBuf> {
        self.user_root
            .iter()
            .cloned()
            .chain(core::iter::once(self.bundled_root.clone()))
            .collect()
    }
}

/// Default per-user asset root
///
/// `$MONOPLAY_ASSET_DIR` when set, otherwise `$HOME/.monoplay`.
pub fn default_user_root() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(ASSET_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join(USER_DIR_NAME))
}

/// Asset root bundled with the crate
pub fn default_bundled_root() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/assets"))
}

/// Builder for constructing controller configuration
///
/// # Example
///
/// ```
/// use monoplay::{Builder, Dimensions};
///
/// let dims = match Dimensions::new(128, 32) {
///     Ok(dims) => dims,
///     Err(_) => return,
/// };
/// let config = match Builder::new().dimensions(dims).idle_fps(4.0).build() {
///     Ok(config) => config,
///     Err(_) => return,
/// };
/// assert_eq!(config.idle_animation, "idle");
/// ```
#[must_use]
pub struct Builder {
    /// Display dimensions (required)
    dimensions: Option<Dimensions>,
    /// Per-user override root
    user_root: Option<PathBuf>,
    /// Bundled default root
    bundled_root: PathBuf,
    /// Idle animation name
    idle_animation: String,
    /// Idle animation rate
    idle_fps: f32,
    /// Message font
    font: &'static MonoFont<'static>,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            dimensions: None,
            user_root: default_user_root(),
            bundled_root: default_bundled_root(),
            idle_animation: DEFAULT_IDLE_ANIMATION.to_string(),
            idle_fps: DEFAULT_IDLE_FPS,
            font: &FONT_6X10,
        }
    }
}

impl Builder {
    /// Create a new Builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set display dimensions (required)
    pub fn dimensions(mut self, dims: Dimensions) -> Self {
        self.dimensions = Some(dims);
        self
    }

    /// Set the per-user override root
    pub fn user_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.user_root = Some(root.into());
        self
    }

    /// Disable the per-user override root
    pub fn without_user_root(mut self) -> Self {
        self.user_root = None;
        self
    }

    /// Set the bundled default root
    pub fn bundled_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.bundled_root = root.into();
        self
    }

    /// Set the animation played when going idle
    pub fn idle_animation(mut self, name: &str) -> Self {
        self.idle_animation = name.to_string();
        self
    }

    /// Set the idle animation frame rate
    pub fn idle_fps(mut self, fps: f32) -> Self {
        self.idle_fps = fps;
        self
    }

    /// Set the message font
    pub fn font(mut self, font: &'static MonoFont<'static>) -> Self {
        self.font = font;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::MissingDimensions` if dimensions were not set,
    /// `BuilderError::InvalidFps` for a non-positive idle rate and
    /// `BuilderError::EmptyIdleAnimation` for an empty idle name and
    /// `BuilderError::InvalidIdleAnimation` for an idle name that is not a
    /// single path component.
    pub fn build(self) -> Result<Config, BuilderError> {
        if !(self.idle_fps.is_finite() && self.idle_fps > 0.0) {
            return Err(BuilderError::InvalidFps);
        }
        if self.idle_animation.is_empty() {
            return Err(BuilderError::EmptyIdleAnimation);
        }
        if validate_asset_name(&self.idle_animation).is_err() {
            return Err(BuilderError::InvalidIdleAnimation);
        }
        Ok(Config {
            dimensions: self.dimensions.ok_or(BuilderError::MissingDimensions)?,
            user_root: self.user_root,
            bundled_root: self.bundled_root,
            idle_animation: self.idle_animation,
            idle_fps: self.idle_fps,
            font: self.font,
        })
    }
}
