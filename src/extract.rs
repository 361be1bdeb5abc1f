//! Subject isolation: decode the cut-out and crop it to its opaque pixels.

use image::{imageops, RgbaImage};

use crate::error::{Error, Result};

/// Half-open pixel rectangle: `left..right` by `top..bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    /// First column inside the box.
    pub left: u32,
    /// First row inside the box.
    pub top: u32,
    /// First column past the box.
    pub right: u32,
    /// First row past the box.
    pub bottom: u32,
}

impl BoundingBox {
    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

/// Smallest rectangle enclosing every pixel with non-zero alpha.
///
/// Returns `None` when the image is fully transparent.
#[must_use]
pub fn bounding_box(image: &RgbaImage) -> Option<BoundingBox> {
    let mut bbox: Option<BoundingBox> = None;

    for (x, y, px) in image.enumerate_pixels() {
        if px[3] == 0 {
            continue;
        }
        match bbox.as_mut() {
            None => {
                bbox = Some(BoundingBox {
                    left: x,
                    top: y,
                    right: x + 1,
                    bottom: y + 1,
                });
            }
            Some(b) => {
                b.left = b.left.min(x);
                b.right = b.right.max(x + 1);
                // Rows arrive in order, so only the bottom edge can grow.
                b.bottom = y + 1;
            }
        }
    }

    bbox
}

/// Decode a segmented image and crop it to its subject.
///
/// # Errors
///
/// Returns [`Error::Decode`] for malformed data and [`Error::NoSubject`]
/// if every pixel is fully transparent.
pub fn extract(segmented: &[u8]) -> Result<RgbaImage> {
    let rgba = image::load_from_memory(segmented)
        .map_err(Error::Decode)?
        .to_rgba8();

    let bbox = bounding_box(&rgba).ok_or(Error::NoSubject)?;
    log::debug!(
        "subject box ({}, {})-({}, {}) in {}x{}",
        bbox.left,
        bbox.top,
        bbox.right,
        bbox.bottom,
        rgba.width(),
        rgba.height()
    );

    Ok(imageops::crop_imm(&rgba, bbox.left, bbox.top, bbox.width(), bbox.height()).to_image())
}
