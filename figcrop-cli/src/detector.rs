//! Detector construction for the CLI.

use std::path::PathBuf;

use anyhow::{Context, Result};
use figcrop_core::{Detector, StaticDetector, YoloDetector};
use figcrop_utils::{config::AppSettings, normalize_path};
use log::info;

use crate::args::DetectorArgs;

/// Build the detector named on the command line.
///
/// A `--detections` file wins; otherwise the model path from the flags or the
/// settings file is loaded.
pub fn build_detector(args: &DetectorArgs, settings: &AppSettings) -> Result<Box<dyn Detector>> {
    if let Some(path) = args.detections.as_ref() {
        let resolved = normalize_path(path)?;
        let detector = StaticDetector::from_json_path(&resolved)?;
        info!(
            "Loaded {} detection(s) from {}",
            detector.detections().len(),
            resolved.display()
        );
        return Ok(Box::new(detector));
    }

    let model_path = settings
        .model_path
        .as_ref()
        .map(PathBuf::from)
        .context("no detector configured; pass --model or --detections, or set model_path")?;
    let model_path = normalize_path(&model_path)
        .with_context(|| format!("model file not found: {}", model_path.display()))?;

    info!(
        "Loading YOLO model from {} at resolution {}x{}",
        model_path.display(),
        settings.detection.input_width,
        settings.detection.input_height
    );
    let detector = YoloDetector::from_settings(&model_path, &settings.detection)?;
    Ok(Box::new(detector))
}
