//! Padded crop extraction.
//!
//! A region's box is grown by a fraction of its own size on every side, then
//! clipped so the corners stay within `[0, width-1] × [0, height-1]`. The pixel
//! block `[y1, y2) × [x1, x2)` of the clipped box is copied out as the crop.

use image::DynamicImage;
use log::{debug, warn};

use crate::{
    error::{PipelineError, RegionId},
    geometry::{FrameSize, PixelBox},
    selector::Region,
};

/// Expand `original` by `trunc(w * pad_fraction)` horizontally and
/// `trunc(h * pad_fraction)` vertically, then clip against `frame`.
///
/// Only the outward edges are clamped: `x1` and `y1` are floored at zero and
/// `x2`/`y2` capped at `width-1`/`height-1`. Boxes lying outside the frame
/// therefore come back inverted, which [`PixelBox::is_empty`] reports.
pub fn pad_box(original: PixelBox, frame: FrameSize, pad_fraction: f64) -> PixelBox {
    let box_w = i64::from(original.x2) - i64::from(original.x1);
    let box_h = i64::from(original.y2) - i64::from(original.y1);
    let pad_w = (box_w as f64 * pad_fraction).trunc() as i64;
    let pad_h = (box_h as f64 * pad_fraction).trunc() as i64;
    let (max_x, max_y) = frame.max_corner();

    let x1 = (i64::from(original.x1) - pad_w).max(0);
    let y1 = (i64::from(original.y1) - pad_h).max(0);
    let x2 = (i64::from(original.x2) + pad_w).min(i64::from(max_x));
    let y2 = (i64::from(original.y2) + pad_h).min(i64::from(max_y));

    PixelBox::new(saturate(x1), saturate(y1), saturate(x2), saturate(y2))
}

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Owned sub-image cut from the source, with the box needed to paste it back.
#[derive(Debug, Clone)]
pub struct Crop {
    pub id: RegionId,
    pub padded_box: PixelBox,
    pub image: DynamicImage,
}

/// Copy the pixels under `region.padded_box` out of `image`.
pub fn crop(image: &DynamicImage, region: &Region) -> Result<Crop, PipelineError> {
    let padded_box = region.padded_box;
    if padded_box.is_empty() {
        return Err(PipelineError::EmptyRegion {
            id: region.id,
            padded_box,
        });
    }

    let frame = FrameSize::of(image);
    if !padded_box.fits_within(frame) {
        return Err(PipelineError::RegionOutOfBounds {
            id: region.id,
            padded_box,
            width: frame.width,
            height: frame.height,
        });
    }

    let sub = image.crop_imm(
        padded_box.x1 as u32,
        padded_box.y1 as u32,
        padded_box.width() as u32,
        padded_box.height() as u32,
    );
    debug!(
        "cropped region {} at {} ({}x{})",
        region.id,
        padded_box,
        sub.width(),
        sub.height()
    );
    Ok(Crop {
        id: region.id,
        padded_box,
        image: sub,
    })
}

/// A region that produced no crop, and why.
#[derive(Debug)]
pub struct SkippedRegion {
    pub id: RegionId,
    pub error: PipelineError,
}

/// Result of cropping a batch of regions.
#[derive(Debug, Default)]
pub struct CropBatch {
    pub crops: Vec<Crop>,
    pub skipped: Vec<SkippedRegion>,
}

/// Crop every region, skipping the ones that fail.
///
/// Skipped regions are logged at warn level and listed in the batch; the
/// remaining crops keep their ids.
pub fn crop_all(image: &DynamicImage, regions: &[Region]) -> CropBatch {
    let _guard = figcrop_utils::timing_guard("figcrop_core::crop_all", log::Level::Debug);
    let mut batch = CropBatch::default();
    for region in regions {
        match crop(image, region) {
            Ok(crop) => batch.crops.push(crop),
            Err(error) => {
                warn!("skipping region {}: {error}", region.id);
                batch.skipped.push(SkippedRegion {
                    id: region.id,
                    error,
                });
            }
        }
    }
    batch
}
