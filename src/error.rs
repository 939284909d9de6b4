//! Error types for the controller
//!
//! This module defines error types for configuration building ([`BuilderError`]),
//! asset resolution ([`AssetError`]) and display operations ([`Error`]).
//!
//! ## Error Types
//!
//! - [`BuilderError`] - Errors during configuration construction
//! - [`AssetError`] - Missing or undecodable animation frames and icons
//! - [`Error`] - Runtime errors from the public display operations
//!
//! Missing assets and device failures are non-fatal: the controller logs them,
//! leaves the display untouched and stays usable.
//!
//! ## Example
//!
//! ```
//! use monoplay::{Builder, BuilderError, Dimensions};
//!
//! // Missing dimensions
//! let result = Builder::new().build();
//! assert!(matches!(result, Err(BuilderError::MissingDimensions)));
//!
//! // Invalid dimensions
//! let result = Dimensions::new(0, 32);
//! assert!(result.is_err());
//! ```

use std::fmt;
use std::path::PathBuf;

/// Kind of asset looked up by the frame source
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssetKind {
    /// A directory of animation frames (`animations/<name>/*.bmp`)
    Animation,
    /// A single still image (`icons/<name>.bmp`)
    Icon,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Animation => write!(f, "Animation"),
            Self::Icon => write!(f, "Image"),
        }
    }
}

/// Errors raised while resolving and decoding assets
#[derive(Debug)]
pub enum AssetError {
    /// No asset location produced any frames for the name
    NotFound {
        /// What was looked up
        kind: AssetKind,
        /// Requested asset name
        name: String,
    },
    /// A bitmap file could not be decoded
    Decode {
        /// File that failed to decode
        path: PathBuf,
        /// Decoder message
        reason: String,
    },
    /// A file or directory could not be read
    Io {
        /// Path being read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl AssetError {
    /// Whether this error means the asset is simply absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { kind, name } => write!(f, "{kind} '{name}' not found"),
            Self::Decode { path, reason } => {
                write!(f, "Failed to decode {}: {reason}", path.display())
            }
            Self::Io { path, source } => write!(f, "Failed to read {}: {source}", path.display()),
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors that can occur when driving the display
///
/// Generic over the device sink's error type so callers can match on the
/// underlying hardware failure.
#[derive(Debug)]
pub enum Error<E> {
    /// Asset lookup or decoding failed
    Asset(AssetError),
    /// The device sink rejected a frame
    ///
    /// Wraps the error returned by [`DeviceSink`](crate::sink::DeviceSink).
    Device(E),
    /// An argument was rejected before any state changed
    InvalidArgument(&'static str),
    /// A background thread could not be started
    Spawn(std::io::Error),
}

impl<E> From<AssetError> for Error<E> {
    fn from(err: AssetError) -> Self {
        Self::Asset(err)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset(err) => write!(f, "{err}"),
            Self::Device(err) => write!(f, "Device error: {err:?}"),
            Self::InvalidArgument(what) => write!(f, "Invalid argument: {what}"),
            Self::Spawn(err) => write!(f, "Failed to spawn thread: {err}"),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for Error<E> {}

/// Errors that can occur when building configuration
///
/// These errors occur during the builder pattern before the controller is created.
#[derive(Debug, PartialEq)]
pub enum BuilderError {
    /// Dimensions were not specified
    ///
    /// [`Builder::dimensions()`](crate::config::Builder::dimensions) must be called before building.
    MissingDimensions,
    /// Invalid dimensions provided
    ///
    /// See [`Dimensions::new()`](crate::config::Dimensions::new) for constraints.
    InvalidDimensions {
        /// Width in pixels requested
        width: u32,
        /// Height in pixels requested
        height: u32,
    },
    /// Idle animation rate must be finite and positive
    InvalidFps,
    /// Idle animation name was empty
    EmptyIdleAnimation,
    /// Idle animation name was not a single path component
    InvalidIdleAnimation,
}

impl fmt::Display for BuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDimensions => write!(f, "Dimensions must be specified"),
            Self::InvalidDimensions { width, height } => {
                write!(f, "Invalid dimensions {width}x{height} (both must be non-zero)")
            }
            Self::InvalidFps => write!(f, "Idle fps must be a positive number"),
            Self::EmptyIdleAnimation => write!(f, "Idle animation name must not be empty"),
            Self::InvalidIdleAnimation => {
                write!(f, "Idle animation name must be a single path component")
            }
        }
    }
}

impl std::error::Error for BuilderError {}
