//! JSON coordinate record linking crops back to their source image.
//!
//! Written by the crop step and read by recomposition. Padded boxes are stored
//! verbatim and never recomputed on load.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    cropper::CropBatch,
    error::RegionId,
    geometry::{FrameSize, PixelBox},
    recompose::RegionTable,
    selector::{Region, SelectionCriteria},
};

/// One region entry in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub id: RegionId,
    pub original_box: PixelBox,
    pub padded_box: PixelBox,
    pub class_id: u32,
    pub confidence: f32,
    /// Crop file name relative to the manifest, when the crop was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_file: Option<String>,
}

impl RegionRecord {
    pub fn from_region(region: &Region, crop_file: Option<String>) -> Self {
        Self {
            id: region.id,
            original_box: region.original_box,
            padded_box: region.padded_box,
            class_id: region.class_id,
            confidence: region.confidence,
            crop_file,
        }
    }

    /// Human-readable summary, e.g. `Person 1:\n  Padded Box: x1=80, y1=80, x2=220, y2=220`.
    pub fn describe(&self, label: &str) -> String {
        format!("{label} {}:\n  Padded Box: {}", self.id, self.padded_box)
    }
}

/// Coordinate record for one cropped image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionManifest {
    /// Source image path as given on the command line.
    pub source: String,
    pub image_width: u32,
    pub image_height: u32,
    pub pad_fraction: f64,
    pub target_class_id: u32,
    pub confidence_threshold: f32,
    pub regions: Vec<RegionRecord>,
    /// Ids that were selected but produced no crop.
    #[serde(default)]
    pub skipped: Vec<RegionId>,
}

impl RegionManifest {
    /// Assemble a manifest from a crop batch.
    ///
    /// Only regions that were actually cropped are recorded; `crop_file` maps an
    /// id to the file name its crop was saved under.
    pub fn from_batch(
        source: impl Into<String>,
        frame: FrameSize,
        pad_fraction: f64,
        criteria: &SelectionCriteria,
        regions: &[Region],
        batch: &CropBatch,
        crop_file: impl Fn(RegionId) -> Option<String>,
    ) -> Self {
        let records = batch
            .crops
            .iter()
            .filter_map(|crop| regions.iter().find(|region| region.id == crop.id))
            .map(|region| RegionRecord::from_region(region, crop_file(region.id)))
            .collect();
        Self {
            source: source.into(),
            image_width: frame.width,
            image_height: frame.height,
            pad_fraction,
            target_class_id: criteria.target_class_id,
            confidence_threshold: criteria.confidence_threshold,
            regions: records,
            skipped: batch.skipped.iter().map(|skip| skip.id).collect(),
        }
    }

    pub fn frame(&self) -> FrameSize {
        FrameSize::new(self.image_width, self.image_height)
    }

    /// Padded boxes keyed by region id, ready for recomposition.
    pub fn region_table(&self) -> RegionTable {
        self.regions
            .iter()
            .map(|record| (record.id, record.padded_box))
            .collect()
    }

    pub fn region(&self, id: RegionId) -> Option<&RegionRecord> {
        self.regions.iter().find(|record| record.id == id)
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse manifest JSON at {}", path.display()))
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let payload =
            serde_json::to_string_pretty(self).context("failed to serialize manifest JSON")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write manifest {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cropper::{SkippedRegion, crop_all, pad_box};
    use crate::error::PipelineError;
    use image::{DynamicImage, RgbImage};
    use tempfile::tempdir;

    fn region(id: RegionId, original: PixelBox, frame: FrameSize) -> Region {
        Region {
            id,
            original_box: original,
            padded_box: pad_box(original, frame, 0.2),
            class_id: 0,
            confidence: 0.75,
        }
    }

    #[test]
    fn manifest_round_trips_and_keeps_boxes() {
        let frame = FrameSize::new(800, 600);
        let image = DynamicImage::ImageRgb8(RgbImage::new(800, 600));
        let regions = vec![
            region(1, PixelBox::new(100, 100, 200, 200), frame),
            region(2, PixelBox::new(300, 100, 400, 300), frame),
        ];
        let batch = crop_all(&image, &regions);
        let manifest = RegionManifest::from_batch(
            "scene.jpg",
            frame,
            0.2,
            &SelectionCriteria::default(),
            &regions,
            &batch,
            |id| Some(format!("person_{id}.jpg")),
        );

        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested/regions.json");
        manifest.save_to_path(&path).expect("save");
        let loaded = RegionManifest::load_from_path(&path).expect("load");

        assert_eq!(loaded, manifest);
        assert_eq!(loaded.frame(), frame);
        let table = loaded.region_table();
        assert_eq!(table.get(1), Some(PixelBox::new(80, 80, 220, 220)));
        assert_eq!(loaded.region(2).and_then(|r| r.crop_file.as_deref()), Some("person_2.jpg"));
    }

    #[test]
    fn skipped_regions_are_listed_not_recorded() {
        let frame = FrameSize::new(100, 100);
        let regions = vec![region(1, PixelBox::new(10, 10, 20, 20), frame)];
        let batch = CropBatch {
            crops: Vec::new(),
            skipped: vec![SkippedRegion {
                id: 1,
                error: PipelineError::EmptyRegion {
                    id: 1,
                    padded_box: PixelBox::new(5, 5, 5, 5),
                },
            }],
        };
        let manifest = RegionManifest::from_batch(
            "x.png",
            frame,
            0.2,
            &SelectionCriteria::default(),
            &regions,
            &batch,
            |_| None,
        );
        assert!(manifest.regions.is_empty());
        assert_eq!(manifest.skipped, vec![1]);
    }

    #[test]
    fn describe_matches_console_format() {
        let frame = FrameSize::new(800, 600);
        let record =
            RegionRecord::from_region(&region(1, PixelBox::new(100, 100, 200, 200), frame), None);
        assert_eq!(
            record.describe("Person"),
            "Person 1:\n  Padded Box: x1=80, y1=80, x2=220, y2=220"
        );
    }

    #[test]
    fn boxes_serialize_as_arrays() {
        let record = RegionRecord {
            id: 1,
            original_box: PixelBox::new(1, 2, 3, 4),
            padded_box: PixelBox::new(0, 1, 4, 5),
            class_id: 0,
            confidence: 0.5,
            crop_file: None,
        };
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["padded_box"], serde_json::json!([0, 1, 4, 5]));
        assert!(json.get("crop_file").is_none());
    }
}
