//! Display-sized monochrome frame buffers
//!
//! A [`Frame`] holds exactly one display's worth of pixels packed one bit per
//! pixel. Rows are padded to a whole byte and pixels are packed left to right,
//! most significant bit first:
//!
//! ```text
//! byte index = x / 8 + stride * y
//! bit mask   = 0x80 >> (x % 8)
//! ```
//!
//! Frames implement [`DrawTarget`] so anything in the embedded-graphics
//! ecosystem (text, primitives, images) can be composed onto them. Drawing
//! outside the frame is clipped.
//!
//! ## Example
//!
//! ```
//! use embedded_graphics::{pixelcolor::BinaryColor, prelude::*, primitives::{PrimitiveStyle, Rectangle}};
//! use monoplay::{Dimensions, Frame};
//!
//! let dims = match Dimensions::new(16, 8) {
//!     Ok(dims) => dims,
//!     Err(_) => return,
//! };
//! let mut frame = Frame::new(dims);
//! let _ = Rectangle::new(Point::new(0, 0), Size::new(8, 1))
//!     .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
//!     .draw(&mut frame);
//! assert_eq!(frame.as_bytes()[0], 0xFF);
//! assert_eq!(frame.lit_pixels(), 8);
//! ```

use core::convert::Infallible;

use embedded_graphics_core::{
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Point, Size},
    pixelcolor::BinaryColor,
    prelude::Pixel,
};

use crate::config::Dimensions;

/// Locate the byte and bit for a pixel
fn bit_position(x: u32, y: u32, stride: usize) -> (usize, u8) {
    let index = x as usize / 8 + stride * y as usize;
    let bit = 0x80 >> (x % 8);
    (index, bit)
}

/// Immutable-once-built monochrome pixel buffer sized to the display
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    dimensions: Dimensions,
    buffer: Vec<u8>,
}

impl Frame {
    /// Create a blank (all off) frame
    pub fn new(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            buffer: vec![0x00; dimensions.buffer_size()],
        }
    }

    /// Frame dimensions
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Packed pixel data, row-major, MSB first
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Read a pixel, `None` outside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<BinaryColor> {
        if x >= self.dimensions.width || y >= self.dimensions.height {
            return None;
        }
        let (index, bit) = bit_position(x, y, self.dimensions.stride());
        Some(if self.buffer[index] & bit != 0 {
            BinaryColor::On
        } else {
            BinaryColor::Off
        })
    }

    /// Number of lit pixels
    pub fn lit_pixels(&self) -> u32 {
        let stride = self.dimensions.stride();
        let full_bytes = self.dimensions.width as usize / 8;
        let tail_mask = match self.dimensions.width % 8 {
            0 => 0x00,
            rem => 0xFFu8 << (8 - rem),
        };
        self.buffer
            .chunks(stride)
            .map(|row| {
                let full: u32 = row[..full_bytes].iter().map(|b| b.count_ones()).sum();
                let tail = row.get(full_bytes).map_or(0, |b| (b & tail_mask).count_ones());
                full + tail
            })
            .sum()
    }

    /// Whether every pixel is off
    pub fn is_blank(&self) -> bool {
        self.lit_pixels() == 0
    }

    /// Fill every pixel with a color
    pub fn fill(&mut self, color: BinaryColor) {
        let value = match color {
            BinaryColor::On => 0xFF,
            BinaryColor::Off => 0x00,
        };
        self.buffer.fill(value);
    }

    /// Copy of this frame with every pixel flipped
    pub fn inverted(&self) -> Self {
        let mut frame = self.clone();
        for y in 0..self.dimensions.height {
            for x in 0..self.dimensions.width {
                if let Some(color) = self.pixel(x, y) {
                    frame.set_pixel(x, y, color.invert());
                }
            }
        }
        frame
    }

    fn set_pixel(&mut self, x: u32, y: u32, color: BinaryColor) {
        if x >= self.dimensions.width || y >= self.dimensions.height {
            return;
        }
        let (index, bit) = bit_position(x, y, self.dimensions.stride());
        match color {
            BinaryColor::On => self.buffer[index] |= bit,
            BinaryColor::Off => self.buffer[index] &= !bit,
        }
    }
}

impl core::fmt::Debug for Frame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.dimensions.width)
            .field("height", &self.dimensions.height)
            .field("lit", &self.lit_pixels())
            .finish()
    }
}

impl DrawTarget for Frame {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<Iter>(&mut self, pixels: Iter) -> Result<(), Self::Error>
    where
        Iter: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(Point { x, y }, color) in pixels {
            if x < 0 || y < 0 {
                continue;
            }
            self.set_pixel(x as u32, y as u32, color);
        }
        Ok(())
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.dimensions.width, self.dimensions.height)
    }
}
