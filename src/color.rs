//! Monochrome pixel conversion
//!
//! Source bitmaps may be any depth; the display only knows lit ([`BinaryColor::On`])
//! and dark ([`BinaryColor::Off`]) pixels. Colors are reduced to luma and
//! thresholded at the midpoint.
//!
//! | Luma      | Normal | Inverted |
//! |-----------|--------|----------|
//! | `>= 128`  | On     | Off      |
//! | `< 128`   | Off    | On       |
//!
//! ## Example
//!
//! ```
//! use embedded_graphics::pixelcolor::{BinaryColor, Rgb888};
//! use monoplay::color::Polarity;
//!
//! assert_eq!(Polarity::Normal.apply(Rgb888::new(255, 255, 255)), BinaryColor::On);
//! assert_eq!(Polarity::Inverted.apply(Rgb888::new(255, 255, 255)), BinaryColor::Off);
//! ```

use embedded_graphics_core::pixelcolor::{BinaryColor, Rgb888, RgbColor};

/// Luma at or above which a pixel is lit
pub const LUMA_THRESHOLD: u8 = 128;

/// ITU-R 601-2 luma of an RGB color
pub fn luma(color: Rgb888) -> u8 {
    let weighted =
        u32::from(color.r()) * 299 + u32::from(color.g()) * 587 + u32::from(color.b()) * 114;
    (weighted / 1000) as u8
}

/// Polarity used when mapping source pixels to display pixels
///
/// Icons are stored with the opposite on/off convention to the display,
/// so still images are decoded [`Inverted`](Polarity::Inverted) while
/// animation frames use [`Normal`](Polarity::Normal).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Polarity {
    /// Bright source pixels are lit
    #[default]
    Normal,
    /// Dark source pixels are lit
    Inverted,
}

impl Polarity {
    /// Map a source color to a display pixel
    pub fn apply(self, color: Rgb888) -> BinaryColor {
        let lit = if luma(color) >= LUMA_THRESHOLD {
            BinaryColor::On
        } else {
            BinaryColor::Off
        };
        match self {
            Self::Normal => lit,
            Self::Inverted => lit.invert(),
        }
    }
}
