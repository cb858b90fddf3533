//! Selective recomposition of edited crops into a copy of the base image.

use std::{
    borrow::Cow,
    collections::{BTreeMap, BTreeSet},
};

use figcrop_utils::{ResizeFilter, timing_guard};
use image::{
    ColorType, DynamicImage, GenericImageView,
    imageops::{FilterType, replace},
};
use log::{debug, trace};

use crate::{
    error::{PipelineError, RegionId},
    geometry::{FrameSize, PixelBox},
    selector::Region,
};

/// Replacement images keyed by region id. Iteration is in ascending id order.
pub type Replacements = BTreeMap<RegionId, DynamicImage>;

/// Padded boxes keyed by region id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegionTable {
    boxes: BTreeMap<RegionId, PixelBox>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_regions(regions: &[Region]) -> Self {
        regions
            .iter()
            .map(|region| (region.id, region.padded_box))
            .collect()
    }

    pub fn insert(&mut self, id: RegionId, padded_box: PixelBox) -> Option<PixelBox> {
        self.boxes.insert(id, padded_box)
    }

    pub fn get(&self, id: RegionId) -> Option<PixelBox> {
        self.boxes.get(&id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = RegionId> + '_ {
        self.boxes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

impl FromIterator<(RegionId, PixelBox)> for RegionTable {
    fn from_iter<T: IntoIterator<Item = (RegionId, PixelBox)>>(iter: T) -> Self {
        Self {
            boxes: iter.into_iter().collect(),
        }
    }
}

/// Writes replacement images back into their regions.
#[derive(Debug, Clone, Copy)]
pub struct Recompositor {
    filter: FilterType,
}

impl Default for Recompositor {
    fn default() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }
}

impl From<ResizeFilter> for Recompositor {
    fn from(filter: ResizeFilter) -> Self {
        Self::new(filter.as_filter_type())
    }
}

impl Recompositor {
    pub fn new(filter: FilterType) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> FilterType {
        self.filter
    }

    /// Replace every region that has an entry in `replacements`.
    ///
    /// All ids are validated before any pixel is written. Regions without a
    /// replacement keep their original pixels; an empty map yields an exact copy
    /// of `base`.
    pub fn recompose(
        &self,
        base: &DynamicImage,
        regions: &RegionTable,
        replacements: &Replacements,
    ) -> Result<DynamicImage, PipelineError> {
        let ids: Vec<RegionId> = replacements.keys().copied().collect();
        self.apply(base, regions, replacements, &ids)
    }

    /// Replace only the regions named in `include`.
    ///
    /// Every included id must have both a stored box and a replacement image.
    pub fn recompose_with_policy(
        &self,
        base: &DynamicImage,
        regions: &RegionTable,
        replacements: &Replacements,
        include: &BTreeSet<RegionId>,
    ) -> Result<DynamicImage, PipelineError> {
        let ids: Vec<RegionId> = include.iter().copied().collect();
        self.apply(base, regions, replacements, &ids)
    }

    fn apply(
        &self,
        base: &DynamicImage,
        regions: &RegionTable,
        replacements: &Replacements,
        ids: &[RegionId],
    ) -> Result<DynamicImage, PipelineError> {
        let _guard = timing_guard("figcrop_core::recompose", log::Level::Debug);
        let frame = FrameSize::of(base);

        let mut plan = Vec::with_capacity(ids.len());
        for &id in ids {
            let target = validate_target(id, regions, frame)?;
            let replacement = replacements
                .get(&id)
                .ok_or(PipelineError::MissingReplacement(id))?;
            plan.push((id, target, replacement));
        }

        let mut canvas = base.clone();
        for (id, target, replacement) in plan {
            let fitted = self.fit(replacement, target, canvas.color());
            paste(&mut canvas, &fitted, target);
            trace!("pasted region {id} at {target}");
        }
        debug!("recomposed {} region(s)", ids.len());
        Ok(canvas)
    }

    /// Stretch `replacement` to exactly fill `target` in the base's colour type.
    ///
    /// The resample is skipped when sizes already match, and the conversion when
    /// the colour types do.
    fn fit<'a>(
        &self,
        replacement: &'a DynamicImage,
        target: PixelBox,
        color: ColorType,
    ) -> Cow<'a, DynamicImage> {
        let width = target.width() as u32;
        let height = target.height() as u32;
        let sized = if replacement.dimensions() == (width, height) {
            Cow::Borrowed(replacement)
        } else {
            Cow::Owned(replacement.resize_exact(width, height, self.filter))
        };
        if sized.color() == color {
            sized
        } else {
            Cow::Owned(convert_to(&sized, color))
        }
    }
}

fn convert_to(image: &DynamicImage, color: ColorType) -> DynamicImage {
    match color {
        ColorType::L8 => image.to_luma8().into(),
        ColorType::La8 => image.to_luma_alpha8().into(),
        ColorType::Rgb8 => image.to_rgb8().into(),
        ColorType::L16 => image.to_luma16().into(),
        ColorType::La16 => image.to_luma_alpha16().into(),
        ColorType::Rgb16 => image.to_rgb16().into(),
        ColorType::Rgba16 => image.to_rgba16().into(),
        ColorType::Rgb32F => image.to_rgb32f().into(),
        ColorType::Rgba32F => image.to_rgba32f().into(),
        _ => image.to_rgba8().into(),
    }
}

/// Write `patch` at the corner of `target` in the canvas's native pixel type.
///
/// `patch` must already share the canvas colour type (see `fit`).
fn paste(canvas: &mut DynamicImage, patch: &DynamicImage, target: PixelBox) {
    let (x, y) = (i64::from(target.x1), i64::from(target.y1));
    match (canvas, patch) {
        (DynamicImage::ImageLuma8(dst), DynamicImage::ImageLuma8(src)) => replace(dst, src, x, y),
        (DynamicImage::ImageLumaA8(dst), DynamicImage::ImageLumaA8(src)) => replace(dst, src, x, y),
        (DynamicImage::ImageRgb8(dst), DynamicImage::ImageRgb8(src)) => replace(dst, src, x, y),
        (DynamicImage::ImageRgba8(dst), DynamicImage::ImageRgba8(src)) => replace(dst, src, x, y),
        (DynamicImage::ImageLuma16(dst), DynamicImage::ImageLuma16(src)) => replace(dst, src, x, y),
        (DynamicImage::ImageLumaA16(dst), DynamicImage::ImageLumaA16(src)) => {
            replace(dst, src, x, y)
        }
        (DynamicImage::ImageRgb16(dst), DynamicImage::ImageRgb16(src)) => replace(dst, src, x, y),
        (DynamicImage::ImageRgba16(dst), DynamicImage::ImageRgba16(src)) => {
            replace(dst, src, x, y)
        }
        (DynamicImage::ImageRgb32F(dst), DynamicImage::ImageRgb32F(src)) => {
            replace(dst, src, x, y)
        }
        (DynamicImage::ImageRgba32F(dst), DynamicImage::ImageRgba32F(src)) => {
            replace(dst, src, x, y)
        }
        (dst, src) => replace(dst, src, x, y),
    }
}

fn validate_target(
    id: RegionId,
    regions: &RegionTable,
    frame: FrameSize,
) -> Result<PixelBox, PipelineError> {
    let target = regions.get(id).ok_or(PipelineError::UnknownRegion(id))?;
    if target.is_empty() {
        return Err(PipelineError::Dimension {
            id,
            width: target.width(),
            height: target.height(),
        });
    }
    if !target.fits_within(frame) {
        return Err(PipelineError::RegionOutOfBounds {
            id,
            padded_box: target,
            width: frame.width,
            height: frame.height,
        });
    }
    Ok(target)
}

/// [`Recompositor::recompose`] with the default bilinear filter.
pub fn recompose(
    base: &DynamicImage,
    regions: &RegionTable,
    replacements: &Replacements,
) -> Result<DynamicImage, PipelineError> {
    Recompositor::default().recompose(base, regions, replacements)
}
