//! `figcrop crop`: select people, save padded crops and the region manifest.

use std::{collections::BTreeMap, fs};

use anyhow::{Context, Result};
use figcrop_core::{
    FrameSize, RegionManifest, SelectionCriteria, crop_all, run_detector, select_regions,
};
use figcrop_utils::{OutputOptions, config::AppSettings, numbered_file_name, save_dynamic_image};
use log::{info, warn};

use crate::{
    args::CropArgs, config::apply_crop_overrides, detector::build_detector, input::load_input,
    types::display_label,
};

pub fn run(args: &CropArgs, settings: &mut AppSettings) -> Result<()> {
    apply_crop_overrides(settings, args);

    let image = load_input(&args.input)?;
    let detector = build_detector(&args.detector, settings)?;
    let detections = run_detector(detector.as_ref(), &image)?;

    let frame = FrameSize::of(&image);
    let criteria = SelectionCriteria::from(&settings.detection);
    let pad_fraction = settings.crop.pad_fraction;
    let regions = select_regions(&detections, &criteria, frame, pad_fraction);
    info!(
        "{} of {} detection(s) selected (class {}, confidence > {})",
        regions.len(),
        detections.len(),
        criteria.target_class_id,
        criteria.confidence_threshold
    );
    if regions.is_empty() {
        warn!("no regions selected in {}", args.input.display());
    }

    let batch = crop_all(&image, &regions);

    fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            args.output_dir.display()
        )
    })?;

    let options = OutputOptions::new(&settings.crop.output_format, settings.crop.jpeg_quality);
    let prefix = settings.crop.file_prefix.as_str();
    let label = display_label(prefix);
    let mut written = BTreeMap::new();
    for crop in &batch.crops {
        let file_name = numbered_file_name(prefix, crop.id, options.format);
        let path = args.output_dir.join(&file_name);
        save_dynamic_image(&crop.image, &path, &options)
            .with_context(|| format!("failed to save crop {}", crop.id))?;
        info!("Saved {}", path.display());
        written.insert(crop.id, file_name);
    }

    let manifest = RegionManifest::from_batch(
        args.input.display().to_string(),
        frame,
        pad_fraction,
        &criteria,
        &regions,
        &batch,
        |id| written.get(&id).cloned(),
    );
    for record in &manifest.regions {
        println!("{}", record.describe(&label));
    }

    let manifest_path = args.output_dir.join(&settings.crop.manifest_name);
    manifest.save_to_path(&manifest_path)?;
    info!(
        "Wrote {} crop(s) and manifest {}",
        batch.crops.len(),
        manifest_path.display()
    );
    if !batch.skipped.is_empty() {
        warn!(
            "{} region(s) skipped: {:?}",
            batch.skipped.len(),
            manifest.skipped
        );
    }
    Ok(())
}
