//! Detector seam: detection types, the [`Detector`] trait and a fixed-output backend.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use figcrop_utils::timing_guard;
use image::DynamicImage;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    error::PipelineError,
    geometry::{FrameSize, PixelBox},
};

/// Axis-aligned box in source image coordinates, stored as corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a box from a center point and extents.
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            x1: (-0.5f32).mul_add(width, cx),
            y1: (-0.5f32).mul_add(height, cy),
            x2: 0.5f32.mul_add(width, cx),
            y2: 0.5f32.mul_add(height, cy),
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Intersection over Union with another box.
    pub fn iou(&self, other: &Self) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let intersection = w * h;
        if intersection <= 0.0 {
            return 0.0;
        }
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 { 0.0 } else { intersection / union }
    }

    /// Integer pixel box, truncating each coordinate toward zero.
    pub fn to_pixel_box(&self) -> PixelBox {
        PixelBox::new(
            self.x1 as i32,
            self.y1 as i32,
            self.x2 as i32,
            self.y2 as i32,
        )
    }
}

impl From<[f32; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BoundingBox> for [f32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// A single detector result.
///
/// Boxes come straight from the detector and may extend past the image edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class_id: u32,
    pub confidence: f32,
}

/// Pluggable object detector.
///
/// Implementations only read the image. Any model or library can sit behind
/// this trait; the rest of the pipeline never sees which one.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, PipelineError>;
}

/// Run `detector` on `image`, rejecting zero-sized images before the call.
pub fn run_detector(
    detector: &dyn Detector,
    image: &DynamicImage,
) -> Result<Vec<Detection>, PipelineError> {
    let frame = FrameSize::of(image);
    if frame.is_empty() {
        return Err(PipelineError::Detector(format!(
            "image has zero dimensions ({}x{})",
            frame.width, frame.height
        )));
    }

    let _guard = timing_guard("figcrop_core::run_detector", log::Level::Debug);
    let detections = detector.detect(image)?;
    debug!(
        "detector returned {} detection(s) for {}x{} image",
        detections.len(),
        frame.width,
        frame.height
    );
    Ok(detections)
}

/// Detector that returns a fixed list regardless of the image.
///
/// Useful when boxes come from another tool or were drawn by hand, and as a
/// stand-in for a model in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDetector {
    detections: Vec<Detection>,
}

/// Accepted layouts for a detections file: a bare list, or an object with a
/// `detections` field (the `figcrop detect --json` output).
#[derive(Deserialize)]
#[serde(untagged)]
enum DetectionsFile {
    List(Vec<Detection>),
    Wrapped { detections: Vec<Detection> },
}

impl StaticDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    /// Parse detections from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let parsed: DetectionsFile =
            serde_json::from_str(json).context("failed to parse detections JSON")?;
        let detections = match parsed {
            DetectionsFile::List(list) => list,
            DetectionsFile::Wrapped { detections } => detections,
        };
        Ok(Self { detections })
    }

    /// Load detections from a JSON file.
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read detections file {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("invalid detections file {}", path.display()))
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }
}

impl Detector for StaticDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>, PipelineError> {
        Ok(self.detections.clone())
    }
}
