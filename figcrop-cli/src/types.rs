//! Shared types for figcrop-cli output.

use figcrop_core::Detection;
use serde::Serialize;

/// Detections for one image, as printed by `figcrop detect`.
///
/// The `detections` field uses the same layout `--detections` accepts, so the
/// output can be fed straight back in.
#[derive(Debug, Serialize)]
pub struct ImageDetections {
    pub image: String,
    pub width: u32,
    pub height: u32,
    pub detections: Vec<Detection>,
}

/// Console label for a crop prefix, e.g. `person` -> `Person`.
pub fn display_label(prefix: &str) -> String {
    let mut chars = prefix.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
