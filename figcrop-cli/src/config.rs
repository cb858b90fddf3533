//! Configuration loading and CLI override logic.

use std::path::PathBuf;

use anyhow::{Context, Result};
use figcrop_utils::{
    config::{AppSettings, default_settings_path},
    normalize_path,
};
use log::info;

use crate::args::{Cli, CropArgs, DetectorArgs, RecomposeArgs, SelectionArgs};

/// Load application settings from a file or use defaults.
pub fn load_settings(config_path: Option<&PathBuf>) -> Result<AppSettings> {
    if let Some(path) = config_path {
        let resolved = normalize_path(path)?;
        let settings = AppSettings::load_from_path(&resolved)?;
        info!("Loaded settings from {}", resolved.display());
        Ok(settings)
    } else {
        let default_path = default_settings_path();
        if default_path.exists() {
            let settings = AppSettings::load_from_path(&default_path).with_context(|| {
                format!(
                    "failed to load default settings from {}",
                    default_path.display()
                )
            })?;
            info!("Loaded settings from {}", default_path.display());
            Ok(settings)
        } else {
            Ok(AppSettings::default())
        }
    }
}

/// Apply flags shared by every subcommand.
pub fn apply_global_overrides(settings: &mut AppSettings, cli: &Cli) {
    if cli.telemetry {
        settings.telemetry.enabled = true;
    }
    if let Some(level) = cli.telemetry_level.as_ref() {
        let normalized = level.trim();
        if !normalized.is_empty() {
            let lower = normalized.to_ascii_lowercase();
            settings.telemetry.level = lower.clone();
            if lower == "off" {
                settings.telemetry.enabled = false;
            }
        }
    }
}

pub fn apply_detector_overrides(settings: &mut AppSettings, args: &DetectorArgs) {
    if let Some(model) = args.model.as_ref() {
        settings.model_path = Some(model.display().to_string());
    }
    if let Some(width) = args.width {
        settings.detection.input_width = width;
    }
    if let Some(height) = args.height {
        settings.detection.input_height = height;
    }
    if let Some(score) = args.score_threshold {
        settings.detection.score_threshold = score;
    }
    if let Some(nms) = args.nms_threshold {
        settings.detection.nms_threshold = nms;
    }
    if let Some(top_k) = args.top_k {
        settings.detection.top_k = top_k;
    }
    if let Some(classes) = args.num_classes {
        settings.detection.num_classes = classes;
    }
}

pub fn apply_selection_overrides(settings: &mut AppSettings, args: &SelectionArgs) {
    if let Some(threshold) = args.confidence_threshold {
        settings.detection.confidence_threshold = threshold;
    }
    if let Some(class_id) = args.target_class {
        settings.detection.target_class_id = class_id;
    }
    if let Some(pad) = args.pad_fraction {
        settings.crop.pad_fraction = pad;
    }
    settings.sanitize();
}

pub fn apply_crop_overrides(settings: &mut AppSettings, args: &CropArgs) {
    apply_detector_overrides(settings, &args.detector);
    if let Some(format) = args.format.as_ref() {
        settings.crop.output_format = format.to_ascii_lowercase();
    }
    if let Some(quality) = args.jpeg_quality {
        settings.crop.jpeg_quality = quality;
    }
    if let Some(prefix) = args.prefix.as_ref() {
        settings.crop.file_prefix = prefix.clone();
    }
    apply_selection_overrides(settings, &args.selection);
}

pub fn apply_recompose_overrides(settings: &mut AppSettings, args: &RecomposeArgs) {
    if let Some(mode) = args.mode {
        settings.recompose.mode = mode;
    }
    if let Some(filter) = args.filter {
        settings.recompose.resize_filter = filter;
    }
    if args.parallel {
        settings.recompose.parallel = true;
    }
    if let Some(format) = args.format.as_ref() {
        settings.recompose.output_format = format.to_ascii_lowercase();
    }
    if let Some(prefix) = args.prefix.as_ref() {
        settings.crop.file_prefix = prefix.clone();
    }
    settings.sanitize();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use figcrop_utils::{ResizeFilter, VariantMode};

    use crate::args::Command;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("valid arguments")
    }

    #[test]
    fn crop_flags_override_settings() {
        let cli = parse(&[
            "figcrop",
            "--telemetry",
            "crop",
            "--input",
            "scene.jpg",
            "--detections",
            "boxes.json",
            "--output-dir",
            "out",
            "--confidence-threshold",
            "0.6",
            "--pad-fraction",
            "-0.1",
            "--format",
            "PNG",
            "--jpeg-quality",
            "0",
        ]);
        let mut settings = AppSettings::default();
        apply_global_overrides(&mut settings, &cli);
        let Command::Crop(args) = &cli.command else {
            panic!("expected crop command");
        };
        apply_crop_overrides(&mut settings, args);

        assert!(settings.telemetry.enabled);
        assert_eq!(settings.detection.confidence_threshold, 0.6);
        assert_eq!(settings.crop.pad_fraction, -0.1);
        assert_eq!(settings.crop.output_format, "png");
        assert_eq!(settings.crop.jpeg_quality, 1);
    }

    #[test]
    fn recompose_flags_override_settings() {
        let cli = parse(&[
            "figcrop",
            "recompose",
            "--base",
            "scene.jpg",
            "--manifest",
            "regions.json",
            "--replacements",
            "edited",
            "--output-dir",
            "out",
            "--mode",
            "include_each",
            "--filter",
            "lanczos",
            "--only",
            "1,3",
            "--parallel",
        ]);
        let mut settings = AppSettings::default();
        let Command::Recompose(args) = &cli.command else {
            panic!("expected recompose command");
        };
        apply_recompose_overrides(&mut settings, args);

        assert_eq!(args.only, vec![1, 3]);
        assert_eq!(settings.recompose.mode, VariantMode::IncludeEach);
        assert_eq!(settings.recompose.resize_filter, ResizeFilter::Lanczos3);
        assert!(settings.recompose.parallel);
    }

    #[test]
    fn telemetry_level_off_disables_telemetry() {
        let cli = parse(&[
            "figcrop",
            "--telemetry",
            "--telemetry-level",
            "OFF",
            "detect",
            "--input",
            "a.png",
        ]);
        let mut settings = AppSettings::default();
        apply_global_overrides(&mut settings, &cli);
        assert!(!settings.telemetry.enabled);
        assert_eq!(settings.telemetry.level, "off");
    }

    #[test]
    fn model_and_detections_conflict() {
        let result = Cli::try_parse_from([
            "figcrop",
            "detect",
            "--input",
            "a.png",
            "--model",
            "m.onnx",
            "--detections",
            "d.json",
        ]);
        assert!(result.is_err());
    }
}
