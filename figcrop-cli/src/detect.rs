//! `figcrop detect`: print every detection for an image.

use std::fs;

use anyhow::{Context, Result};
use figcrop_core::{FrameSize, run_detector};
use figcrop_utils::config::AppSettings;
use log::info;

use crate::{
    args::DetectArgs, config::apply_detector_overrides, detector::build_detector,
    input::load_input, types::ImageDetections,
};

pub fn run(args: &DetectArgs, settings: &mut AppSettings) -> Result<()> {
    apply_detector_overrides(settings, &args.detector);

    let image = load_input(&args.input)?;
    let detector = build_detector(&args.detector, settings)?;
    let detections = run_detector(detector.as_ref(), &image)?;
    info!(
        "{} -> {} detection(s)",
        args.input.display(),
        detections.len()
    );

    let frame = FrameSize::of(&image);
    let output = ImageDetections {
        image: args.input.display().to_string(),
        width: frame.width,
        height: frame.height,
        detections,
    };

    let json = serde_json::to_string_pretty(&output).context("failed to serialize detections")?;
    if let Some(json_path) = args.json.as_ref() {
        if let Some(dir) = json_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }
        fs::write(json_path, json)
            .with_context(|| format!("failed to write detection JSON to {}", json_path.display()))?;
        info!("Wrote detections to {}", json_path.display());
    } else {
        println!("{json}");
    }
    Ok(())
}
