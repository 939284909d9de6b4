//! Image placement and message composition via embedded-graphics
//!
//! Everything drawn on the display is centered on a blank canvas. Sources
//! larger than the canvas are cropped evenly; offsets round toward the
//! top-left corner.
//!
//! ## Example
//!
//! ```
//! use embedded_graphics::{mono_font::ascii::FONT_6X10, prelude::*};
//! use monoplay::{Dimensions, Frame, graphics::{center_offset, draw_message}};
//!
//! assert_eq!(center_offset(Size::new(128, 32), Size::new(16, 16)), Point::new(56, 8));
//!
//! let dims = match Dimensions::new(128, 32) {
//!     Ok(dims) => dims,
//!     Err(_) => return,
//! };
//! let mut canvas = Frame::new(dims);
//! draw_message(&mut canvas, "OK", &FONT_6X10);
//! assert!(!canvas.is_blank());
//! ```

use embedded_graphics::{
    geometry::Dimensions as _,
    mono_font::{MonoFont, MonoTextStyle},
    text::{Baseline, Text},
};
use embedded_graphics_core::{
    Drawable,
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Point, Size},
    pixelcolor::BinaryColor,
    prelude::Pixel,
};

use crate::config::Dimensions;
use crate::frame::Frame;

/// Top-left offset that centers `inner` within `outer`
///
/// Negative when `inner` is larger than `outer`.
pub fn center_offset(outer: Size, inner: Size) -> Point {
    let dx = outer.width as i32 - inner.width as i32;
    let dy = outer.height as i32 - inner.height as i32;
    Point::new(dx.div_euclid(2), dy.div_euclid(2))
}

/// Build a display-sized frame with a source image centered on it
///
/// `pixels` are in source coordinates, `(0, 0)` at the source's top-left.
pub fn centered_frame<I>(dimensions: Dimensions, source_size: Size, pixels: I) -> Frame
where
    I: IntoIterator<Item = Pixel<BinaryColor>>,
{
    let mut frame = Frame::new(dimensions);
    let offset = center_offset(frame.size(), source_size);
    let Ok(()) = frame.draw_iter(
        pixels
            .into_iter()
            .map(|Pixel(point, color)| Pixel(point + offset, color)),
    );
    frame
}

/// Clear the canvas and draw `text` centered on it
///
/// Position comes from the measured bounding box of the rendered text, so
/// multi-line messages are centered as a block.
pub fn draw_message(canvas: &mut Frame, text: &str, font: &MonoFont<'_>) {
    canvas.fill(BinaryColor::Off);

    let style = MonoTextStyle::new(font, BinaryColor::On);
    let bounds = Text::with_baseline(text, Point::zero(), style, Baseline::Top).bounding_box();
    let position = center_offset(canvas.size(), bounds.size) - bounds.top_left;

    let Ok(_) = Text::with_baseline(text, position, style, Baseline::Top).draw(canvas);
}
