//! Integer pixel rectangles and frame sizes.
//!
//! A [`PixelBox`] is stored as corner coordinates `(x1, y1, x2, y2)`. When used to
//! address pixels it is half-open: rows `y1..y2` and columns `x1..x2`.

use std::fmt;

use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

/// Axis-aligned integer rectangle in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[i32; 4]", into = "[i32; 4]")]
pub struct PixelBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl PixelBox {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Horizontal extent; negative when the corners are inverted. Saturates at the `i32` range.
    pub fn width(&self) -> i32 {
        self.x2.saturating_sub(self.x1)
    }

    /// Vertical extent; negative when the corners are inverted. Saturates at the `i32` range.
    pub fn height(&self) -> i32 {
        self.y2.saturating_sub(self.y1)
    }

    /// `true` when the box covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.width()) * i64::from(self.height())
        }
    }

    /// `true` when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &PixelBox) -> bool {
        other.x1 >= self.x1 && other.y1 >= self.y1 && other.x2 <= self.x2 && other.y2 <= self.y2
    }

    /// Overlapping part of two boxes, if any.
    pub fn intersect(&self, other: &PixelBox) -> Option<PixelBox> {
        let overlap = PixelBox::new(
            self.x1.max(other.x1),
            self.y1.max(other.y1),
            self.x2.min(other.x2),
            self.y2.min(other.y2),
        );
        (!overlap.is_empty()).then_some(overlap)
    }

    /// `true` when the half-open pixel block fits inside a frame.
    pub fn fits_within(&self, frame: FrameSize) -> bool {
        self.x1 >= 0
            && self.y1 >= 0
            && i64::from(self.x2) <= i64::from(frame.width)
            && i64::from(self.y2) <= i64::from(frame.height)
    }
}

impl fmt::Display for PixelBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x1={}, y1={}, x2={}, y2={}",
            self.x1, self.y1, self.x2, self.y2
        )
    }
}

impl From<[i32; 4]> for PixelBox {
    fn from([x1, y1, x2, y2]: [i32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<PixelBox> for [i32; 4] {
    fn from(b: PixelBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// Width and height of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Largest valid corner coordinates, `(width - 1, height - 1)`.
    ///
    /// Padded boxes are clipped against these inclusive limits.
    pub fn max_corner(&self) -> (i32, i32) {
        (
            clamp_u32_to_i32(self.width) - 1,
            clamp_u32_to_i32(self.height) - 1,
        )
    }

    /// The clip rectangle `[0, width-1] × [0, height-1]` as a box.
    pub fn clip_box(&self) -> PixelBox {
        let (max_x, max_y) = self.max_corner();
        PixelBox::new(0, 0, max_x, max_y)
    }
}

fn clamp_u32_to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
