//! `figcrop annotate`: draw region boxes for picking and checking crops.

use anyhow::Result;
use figcrop_core::{
    FrameSize, PixelBox, RegionManifest, SelectionCriteria, run_detector, select_regions,
};
use figcrop_utils::{ImageFormatHint, OutputOptions, config::AppSettings, save_dynamic_image};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use log::info;

use crate::{
    args::AnnotateArgs,
    config::{apply_detector_overrides, apply_selection_overrides},
    detector::build_detector,
    input::load_input,
};

const ORIGINAL_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const PADDED_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);

/// Original and padded box of one region.
struct BoxPair {
    original: PixelBox,
    padded: PixelBox,
}

pub fn run(args: &AnnotateArgs, settings: &mut AppSettings) -> Result<()> {
    apply_detector_overrides(settings, &args.detector);
    apply_selection_overrides(settings, &args.selection);

    let image = load_input(&args.input)?;
    let frame = FrameSize::of(&image);

    let boxes: Vec<BoxPair> = if let Some(path) = args.manifest.as_ref() {
        RegionManifest::load_from_path(path)?
            .regions
            .iter()
            .map(|record| BoxPair {
                original: record.original_box,
                padded: record.padded_box,
            })
            .collect()
    } else {
        let detector = build_detector(&args.detector, settings)?;
        let detections = run_detector(detector.as_ref(), &image)?;
        let criteria = SelectionCriteria::from(&settings.detection);
        select_regions(&detections, &criteria, frame, settings.crop.pad_fraction)
            .into_iter()
            .map(|region| BoxPair {
                original: region.original_box,
                padded: region.padded_box,
            })
            .collect()
    };

    let mut canvas = image.to_rgba8();
    for pair in &boxes {
        draw_box(&mut canvas, pair.original, ORIGINAL_COLOR);
        if args.padded {
            draw_box(&mut canvas, pair.padded, PADDED_COLOR);
        }
    }

    let options = OutputOptions {
        format: ImageFormatHint::from_path(&args.output).unwrap_or(ImageFormatHint::Png),
        jpeg_quality: settings.crop.jpeg_quality,
    };
    save_dynamic_image(&DynamicImage::ImageRgba8(canvas), &args.output, &options)?;
    info!(
        "Annotated {} region(s) into {}",
        boxes.len(),
        args.output.display()
    );
    Ok(())
}

/// Draw `bbox` clipped to the canvas; boxes with no visible area are skipped.
fn draw_box(canvas: &mut RgbaImage, bbox: PixelBox, color: Rgba<u8>) {
    if let Some(rect) = rect_from_box(bbox, canvas.width(), canvas.height()) {
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Convert a pixel box into an `imageproc` rectangle inside a `width` x `height` canvas.
fn rect_from_box(bbox: PixelBox, width: u32, height: u32) -> Option<Rect> {
    let canvas = PixelBox::new(0, 0, i32::try_from(width).ok()?, i32::try_from(height).ok()?);
    let visible = bbox.intersect(&canvas)?;
    Some(Rect::at(visible.x1, visible.y1).of_size(visible.width() as u32, visible.height() as u32))
}
