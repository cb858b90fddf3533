//! Region selection: keep detections of one class above a confidence threshold
//! and give each survivor a stable 1-based id.

use figcrop_utils::config::{DetectionSettings, PERSON_CLASS_ID};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    cropper::pad_box,
    detector::Detection,
    error::RegionId,
    geometry::{FrameSize, PixelBox},
};

/// Which detections become regions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionCriteria {
    pub target_class_id: u32,
    /// Detections must score strictly above this value.
    pub confidence_threshold: f32,
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self {
            target_class_id: PERSON_CLASS_ID,
            confidence_threshold: 0.4,
        }
    }
}

impl From<&DetectionSettings> for SelectionCriteria {
    fn from(settings: &DetectionSettings) -> Self {
        Self {
            target_class_id: settings.target_class_id,
            confidence_threshold: settings.confidence_threshold,
        }
    }
}

impl SelectionCriteria {
    pub fn accepts(&self, detection: &Detection) -> bool {
        detection.class_id == self.target_class_id
            && detection.confidence > self.confidence_threshold
    }
}

/// A detection that passed selection, with its assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedDetection {
    pub id: RegionId,
    pub detection: Detection,
}

/// Identified area around one selected detection.
///
/// `padded_box` is computed once here and carried verbatim through cropping,
/// the manifest and recomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub original_box: PixelBox,
    pub padded_box: PixelBox,
    pub class_id: u32,
    pub confidence: f32,
}

impl Region {
    /// Build a region from a selected detection, padding its box inside `frame`.
    pub fn new(selected: &SelectedDetection, frame: FrameSize, pad_fraction: f64) -> Self {
        let original_box = selected.detection.bbox.to_pixel_box();
        Self {
            id: selected.id,
            original_box,
            padded_box: pad_box(original_box, frame, pad_fraction),
            class_id: selected.detection.class_id,
            confidence: selected.detection.confidence,
        }
    }
}

/// Filter detections, preserving input order. Ids count survivors only, starting at 1.
pub fn select(detections: &[Detection], criteria: &SelectionCriteria) -> Vec<SelectedDetection> {
    let selected: Vec<SelectedDetection> = detections
        .iter()
        .filter(|detection| criteria.accepts(detection))
        .zip(1..)
        .map(|(detection, id)| SelectedDetection {
            id,
            detection: detection.clone(),
        })
        .collect();
    debug!(
        "selected {} of {} detection(s) (class {}, confidence > {})",
        selected.len(),
        detections.len(),
        criteria.target_class_id,
        criteria.confidence_threshold
    );
    selected
}

/// [`select`] followed by padding each survivor's box into a [`Region`].
pub fn select_regions(
    detections: &[Detection],
    criteria: &SelectionCriteria,
    frame: FrameSize,
    pad_fraction: f64,
) -> Vec<Region> {
    select(detections, criteria)
        .iter()
        .map(|selected| Region::new(selected, frame, pad_fraction))
        .collect()
}
