use thiserror::Error;

use crate::geometry::PixelBox;

/// Stable identity of a selected region (1-based).
pub type RegionId = u32;

/// Failures raised by the detection, cropping and recomposition stages.
///
/// `Input` and `Detector` abort the whole pipeline. The remaining variants are
/// scoped to one region (cropping) or one variant (recomposition) and callers
/// are expected to log them and carry on with sibling work.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to load input image: {0}")]
    Input(String),

    #[error("detector failed: {0}")]
    Detector(String),

    #[error("region {id} is empty after padding and clipping (box {padded_box})")]
    EmptyRegion { id: RegionId, padded_box: PixelBox },

    #[error("region {0} has no stored padded box")]
    UnknownRegion(RegionId),

    #[error("region {id} resize target has zero area ({width}x{height})")]
    Dimension {
        id: RegionId,
        width: i32,
        height: i32,
    },

    #[error("region {id} box {padded_box} lies outside the {width}x{height} image")]
    RegionOutOfBounds {
        id: RegionId,
        padded_box: PixelBox,
        width: u32,
        height: u32,
    },

    #[error("no replacement image supplied for region {0}")]
    MissingReplacement(RegionId),
}

impl PipelineError {
    /// Returns `true` for failures that abort the whole run rather than one region or variant.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PipelineError::Input(_) | PipelineError::Detector(_))
    }
}
