//! Shared configuration types consumed across the figcrop workspace.
//!
//! Settings are persisted as JSON. Every section uses `#[serde(default)]` so a
//! partial file only overrides the keys it names.

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

/// COCO class id for "person".
pub const PERSON_CLASS_ID: u32 = 0;

/// Detection and selection parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionSettings {
    /// Detections at or below this confidence are discarded by the selector.
    pub confidence_threshold: f32,
    /// Class id kept by the selector (0 = person for COCO-trained models).
    pub target_class_id: u32,
    /// Number of class scores in the model output (80 for COCO).
    pub num_classes: usize,
    /// Minimum score for a raw model row to survive decoding.
    pub score_threshold: f32,
    /// IoU above which overlapping boxes of the same class are suppressed.
    pub nms_threshold: f32,
    /// Maximum detections kept after sorting by score (0 = unlimited).
    pub top_k: usize,
    /// Model input width in pixels.
    pub input_width: u32,
    /// Model input height in pixels.
    pub input_height: u32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.4,
            target_class_id: PERSON_CLASS_ID,
            num_classes: 80,
            score_threshold: 0.25,
            nms_threshold: 0.45,
            top_k: 300,
            input_width: 640,
            input_height: 640,
        }
    }
}

/// Settings for padded crop extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CropSettings {
    /// Fraction of the box width/height added on each side before clipping.
    pub pad_fraction: f64,
    /// File name prefix for crops (`<prefix>_<id>.<ext>`).
    pub file_prefix: String,
    /// Output format: "jpg", "png", or "webp".
    pub output_format: String,
    /// JPEG quality (1-100).
    pub jpeg_quality: u8,
    /// File name of the coordinate manifest written next to the crops.
    pub manifest_name: String,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            pad_fraction: 0.2,
            file_prefix: "person".to_string(),
            output_format: "jpg".to_string(),
            jpeg_quality: 95,
            manifest_name: "regions.json".to_string(),
        }
    }
}

impl CropSettings {
    /// Clamp values to usable ranges.
    pub fn sanitize(&mut self) {
        if !self.pad_fraction.is_finite() {
            self.pad_fraction = CropSettings::default().pad_fraction;
        }
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        if self.file_prefix.trim().is_empty() {
            self.file_prefix = CropSettings::default().file_prefix;
        }
    }
}

/// Resampling filter used when fitting a replacement into its region.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    Nearest,
    /// Bilinear; matches the usual default of desktop image tools.
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeFilter {
    pub fn as_filter_type(self) -> image::imageops::FilterType {
        use image::imageops::FilterType;
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResizeFilter::Nearest => "nearest",
            ResizeFilter::Triangle => "triangle",
            ResizeFilter::CatmullRom => "catmull-rom",
            ResizeFilter::Gaussian => "gaussian",
            ResizeFilter::Lanczos3 => "lanczos3",
        };
        f.write_str(label)
    }
}

impl FromStr for ResizeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(ResizeFilter::Nearest),
            "triangle" | "linear" | "bilinear" => Ok(ResizeFilter::Triangle),
            "catmull-rom" | "catmullrom" | "cubic" => Ok(ResizeFilter::CatmullRom),
            "gaussian" => Ok(ResizeFilter::Gaussian),
            "lanczos3" | "lanczos" => Ok(ResizeFilter::Lanczos3),
            other => Err(format!(
                "invalid resize filter '{other}'; expected nearest, triangle, catmull-rom, gaussian or lanczos3"
            )),
        }
    }
}

/// Which family of inclusion policies the variant driver enumerates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VariantMode {
    /// One variant per region, replacing every region except that one.
    #[default]
    ExcludeEach,
    /// One variant per region, replacing only that region.
    IncludeEach,
    /// A single variant replacing every region.
    All,
}

impl FromStr for VariantMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "exclude-each" => Ok(VariantMode::ExcludeEach),
            "include-each" => Ok(VariantMode::IncludeEach),
            "all" => Ok(VariantMode::All),
            other => Err(format!(
                "invalid variant mode '{other}'; expected exclude-each, include-each or all"
            )),
        }
    }
}

/// A named, explicit inclusion policy loaded from settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PolicySpec {
    pub label: String,
    pub include: Vec<u32>,
}

/// Settings for recomposition and variant generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecomposeSettings {
    pub resize_filter: ResizeFilter,
    pub mode: VariantMode,
    /// Explicit policies; when non-empty they take precedence over `mode`.
    pub policies: Vec<PolicySpec>,
    /// Render variants on the rayon thread pool.
    pub parallel: bool,
    /// Output format for variant images: "jpg", "png", or "webp".
    pub output_format: String,
}

impl Default for RecomposeSettings {
    fn default() -> Self {
        Self {
            resize_filter: ResizeFilter::default(),
            mode: VariantMode::default(),
            policies: Vec::new(),
            parallel: false,
            output_format: "jpg".to_string(),
        }
    }
}

/// Settings controlling optional runtime telemetry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetrySettings {
    pub enabled: bool,
    /// Logging level for timing output (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "debug".to_string(),
        }
    }
}

impl TelemetrySettings {
    /// Resolve the configured level string into a `LevelFilter`.
    pub fn level_filter(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Debug,
        }
    }
}

/// Persistent settings consumed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    /// Optional path to a YOLO ONNX export used for detection.
    pub model_path: Option<String>,
    pub detection: DetectionSettings,
    pub crop: CropSettings,
    pub recompose: RecomposeSettings,
    pub telemetry: TelemetrySettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            model_path: Some("models/yolov8s-seg.onnx".into()),
            detection: DetectionSettings::default(),
            crop: CropSettings::default(),
            recompose: RecomposeSettings::default(),
            telemetry: TelemetrySettings::default(),
        }
    }
}

impl AppSettings {
    /// Load settings from a JSON file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let mut settings: AppSettings = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings JSON at {}", path.display()))?;
        settings.sanitize();
        Ok(settings)
    }

    /// Serialize settings to disk as pretty-printed JSON, overwriting any existing file.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize settings JSON")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write settings file {}", path.display()))?;
        Ok(())
    }

    pub fn sanitize(&mut self) {
        self.crop.sanitize();
        if !self.detection.confidence_threshold.is_finite() {
            self.detection.confidence_threshold = DetectionSettings::default().confidence_threshold;
        }
    }
}

/// Default settings location (`config/figcrop.json` under the working directory).
pub fn default_settings_path() -> PathBuf {
    env::current_dir()
        .map(|dir| dir.join("config/figcrop.json"))
        .unwrap_or_else(|_| PathBuf::from("config/figcrop.json"))
}
