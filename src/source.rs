//! Frame source: asset lookup and decoding
//!
//! Assets live under one or more roots sharing the same layout:
//!
//! ```text
//! <root>/animations/<name>/*.bmp   frames, played in file name order
//! <root>/icons/<name>.bmp          still images
//! ```
//!
//! A [`FrameSource`] holds an ordered list of [`AssetResolver`]s, normally a
//! per-user override root followed by the bundled root. The first resolver
//! that yields frames wins.
//!
//! Every frame returned is exactly display-sized with the source bitmap
//! centered on it. Icons are stored with inverted polarity and are flipped on
//! load; animation frames are used as stored.
//!
//! ## Example
//!
//! ```no_run
//! use monoplay::{Dimensions, source::{AssetDir, FrameSource}};
//!
//! let dims = match Dimensions::new(128, 32) {
//!     Ok(dims) => dims,
//!     Err(_) => return,
//! };
//! let source = FrameSource::new(dims)
//!     .with_resolver(AssetDir::new("/home/pi/.monoplay"))
//!     .with_resolver(AssetDir::new("/usr/share/monoplay"));
//!
//! match source.resolve_animation("idle") {
//!     Ok(frames) => assert!(!frames.is_empty()),
//!     Err(err) => log::error!("{err}"),
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use embedded_graphics_core::{geometry::OriginDimensions, pixelcolor::Rgb888, prelude::Pixel};
use log::{debug, warn};
use tinybmp::Bmp;

use crate::color::Polarity;
use crate::config::{Config, Dimensions};
use crate::error::{AssetError, AssetKind};
use crate::frame::Frame;
use crate::graphics::centered_frame;

/// Directory holding animation frame directories
pub const ANIMATIONS_DIR: &str = "animations";

/// Directory holding still images
pub const ICONS_DIR: &str = "icons";

/// File extension of frame and icon bitmaps
pub const BITMAP_EXTENSION: &str = "bmp";

type AssetResult<T> = core::result::Result<T, AssetError>;

/// Check that `name` is a single, non-empty path component
pub(crate) fn validate_asset_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("asset name must not be empty");
    }
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err("asset name must be a single path component");
    }
    Ok(())
}

/// A single asset location
pub trait AssetResolver: Send + Sync {
    /// Load all frames of an animation, in playback order
    ///
    /// Returns [`AssetError::NotFound`] when this location has no such
    /// animation. Undecodable frames are skipped.
    fn animation(&self, name: &str, dimensions: Dimensions) -> AssetResult<Vec<Frame>>;

    /// Load a still image
    ///
    /// Returns [`AssetError::NotFound`] when this location has no such image.
    fn still(&self, name: &str, dimensions: Dimensions) -> AssetResult<Frame>;
}

/// Decode a bitmap and center it on a display-sized frame
///
/// # Errors
///
/// Returns the decoder's message if the data is not a supported BMP.
pub fn decode_frame(
    bytes: &[u8],
    dimensions: Dimensions,
    polarity: Polarity,
) -> core::result::Result<Frame, String> {
    let bmp = Bmp::<Rgb888>::from_slice(bytes).map_err(|err| format!("{err:?}"))?;
    let pixels = bmp
        .pixels()
        .map(|Pixel(point, color)| Pixel(point, polarity.apply(color)));
    Ok(centered_frame(dimensions, bmp.size(), pixels))
}

fn load_frame(path: &Path, dimensions: Dimensions, polarity: Polarity) -> AssetResult<Frame> {
    let bytes = fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_frame(&bytes, dimensions, polarity).map_err(|reason| AssetError::Decode {
        path: path.to_path_buf(),
        reason,
    })
}

fn is_bitmap(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(BITMAP_EXTENSION))
}

/// Asset root on the filesystem
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetDir {
    root: PathBuf,
}

impl AssetDir {
    /// Resolver for assets under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the frames of animation `name`
    pub fn animation_dir(&self, name: &str) -> PathBuf {
        self.root.join(ANIMATIONS_DIR).join(name)
    }

    /// Path of still image `name`
    pub fn icon_path(&self, name: &str) -> PathBuf {
        self.root
            .join(ICONS_DIR)
            .join(format!("{name}.{BITMAP_EXTENSION}"))
    }
}

impl AssetResolver for AssetDir {
    fn animation(&self, name: &str, dimensions: Dimensions) -> AssetResult<Vec<Frame>> {
        let dir = self.animation_dir(name);
        if !dir.is_dir() {
            return Err(AssetError::NotFound {
                kind: AssetKind::Animation,
                name: name.to_string(),
            });
        }

        let entries = fs::read_dir(&dir).map_err(|source| AssetError::Io {
            path: dir.clone(),
            source,
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| is_bitmap(path))
            .collect();
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            match load_frame(path, dimensions, Polarity::Normal) {
                Ok(frame) => frames.push(frame),
                Err(err) => warn!("Skipping frame of '{name}': {err}"),
            }
        }
        debug!(
            "Loaded {} of {} frames for '{}' from {}",
            frames.len(),
            paths.len(),
            name,
            dir.display()
        );
        Ok(frames)
    }

    fn still(&self, name: &str, dimensions: Dimensions) -> AssetResult<Frame> {
        let path = self.icon_path(name);
        if !path.is_file() {
            return Err(AssetError::NotFound {
                kind: AssetKind::Icon,
                name: name.to_string(),
            });
        }
        load_frame(&path, dimensions, Polarity::Inverted)
    }
}

/// Ordered chain of asset locations
pub struct FrameSource {
    dimensions: Dimensions,
    resolvers: Vec<Box<dyn AssetResolver>>,
}

impl FrameSource {
    /// Empty source producing frames of `dimensions`
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            resolvers: Vec::new(),
        }
    }

    /// Source searching the configured user root, then the bundled root
    pub fn from_config(config: &Config) -> Self {
        config
            .asset_roots()
            .into_iter()
            .fold(Self::new(config.dimensions), |source, root| {
                source.with_resolver(AssetDir::new(root))
            })
    }

    /// Append a resolver, searched after those already added
    pub fn with_resolver(mut self, resolver: impl AssetResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Frame dimensions
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Resolve an animation to its frames
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::NotFound`] if no location yields any frame, or
    /// the first read/decode failure seen when one occurred.
    pub fn resolve_animation(&self, name: &str) -> AssetResult<Vec<Frame>> {
        self.first_found(AssetKind::Animation, name, |resolver| {
            resolver
                .animation(name, self.dimensions)
                .and_then(|frames| {
                    if frames.is_empty() {
                        Err(AssetError::NotFound {
                            kind: AssetKind::Animation,
                            name: name.to_string(),
                        })
                    } else {
                        Ok(frames)
                    }
                })
        })
    }

    /// Resolve a still image to an inverted, centered frame
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::NotFound`] if no location has the image, or the
    /// first read/decode failure seen when one occurred.
    pub fn resolve_still(&self, name: &str) -> AssetResult<Frame> {
        self.first_found(AssetKind::Icon, name, |resolver| {
            resolver.still(name, self.dimensions)
        })
    }

    fn first_found<T>(
        &self,
        kind: AssetKind,
        name: &str,
        mut load: impl FnMut(&dyn AssetResolver) -> AssetResult<T>,
    ) -> AssetResult<T> {
        let mut failure = None;
        for resolver in &self.resolvers {
            match load(resolver.as_ref()) {
                Ok(found) => return Ok(found),
                Err(err) if err.is_not_found() => {}
                Err(err) => {
                    warn!("{kind} '{name}': {err}");
                    failure.get_or_insert(err);
                }
            }
        }
        Err(failure.unwrap_or_else(|| AssetError::NotFound {
            kind,
            name: name.to_string(),
        }))
    }
}

impl core::fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FrameSource")
            .field("dimensions", &self.dimensions)
            .field("resolvers", &self.resolvers.len())
            .finish()
    }
}
