//! Core figure cropping pipeline.
//!
//! Detections come in through the [`Detector`] trait, are filtered into
//! [`Region`]s, cut out as padded crops and, once edited elsewhere, written back
//! into copies of the base image by the [`Recompositor`] and variant driver.

/// Padded crop extraction.
pub mod cropper;
/// Detector trait, detection types and the static backend.
pub mod detector;
/// Pipeline error taxonomy.
pub mod error;
/// Integer boxes and frame sizes.
pub mod geometry;
/// Coordinate manifest shared between cropping and recomposition.
pub mod manifest;
/// ONNX model loading and execution.
pub mod model;
/// YOLO output decoding (class argmax, NMS).
pub mod postprocess;
/// Image to tensor conversion.
pub mod preprocess;
/// Replacement of regions in a base image.
pub mod recompose;
/// Region selection and id assignment.
pub mod selector;
/// Inclusion policies and variant rendering.
pub mod variants;
/// YOLO-backed detector.
pub mod yolo;

pub use cropper::{Crop, CropBatch, SkippedRegion, crop, crop_all, pad_box};
pub use detector::{BoundingBox, Detection, Detector, StaticDetector, run_detector};
pub use error::{PipelineError, RegionId};
pub use geometry::{FrameSize, PixelBox};
pub use manifest::{RegionManifest, RegionRecord};
pub use model::YoloModel;
pub use postprocess::{PostprocessConfig, apply_postprocess};
pub use preprocess::{InputSize, PreprocessConfig, PreprocessOutput, preprocess_image};
pub use recompose::{Recompositor, RegionTable, Replacements, recompose};
pub use selector::{Region, SelectedDetection, SelectionCriteria, select, select_regions};
pub use variants::{
    ExcludeEach, ExplicitPolicies, InclusionPolicy, IncludeEach, PolicyGenerator, ReplaceAll,
    Variant, VariantDriver, VariantFailure, VariantReport, generate_variants,
    generate_variants_parallel, generator_for,
};
pub use yolo::YoloDetector;

/// Returns the crate version for diagnostics.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
