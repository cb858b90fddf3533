use anyhow::Result;
use figcrop_utils::config::DetectionSettings;
use tract_onnx::prelude::Tensor;

use crate::detector::{BoundingBox, Detection};

/// Parameters for decoding raw YOLO outputs.
#[derive(Debug, Clone)]
pub struct PostprocessConfig {
    /// Minimum best-class score for a candidate to be kept.
    pub score_threshold: f32,
    /// IoU above which a lower-scoring box of the same class is suppressed.
    pub nms_threshold: f32,
    /// Maximum detections returned after NMS (0 = unlimited).
    pub top_k: usize,
    /// Number of class score columns following the four box columns.
    pub num_classes: usize,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.25,
            nms_threshold: 0.45,
            top_k: 300,
            num_classes: 80,
        }
    }
}

impl From<&DetectionSettings> for PostprocessConfig {
    fn from(settings: &DetectionSettings) -> Self {
        PostprocessConfig {
            score_threshold: settings.score_threshold,
            nms_threshold: settings.nms_threshold,
            top_k: settings.top_k,
            num_classes: settings.num_classes,
        }
    }
}

/// Row accessor over the prediction block regardless of its orientation.
struct Predictions<'a> {
    data: &'a [f32],
    features: usize,
    anchors: usize,
    features_first: bool,
}

impl Predictions<'_> {
    fn get(&self, anchor: usize, feature: usize) -> f32 {
        if self.features_first {
            self.data[feature * self.anchors + anchor]
        } else {
            self.data[anchor * self.features + feature]
        }
    }
}

/// Decode a YOLOv8-style output tensor into detections in source pixel space.
///
/// The tensor may be `[1, F, N]` (features first, the usual export), `[1, N, F]`
/// or either of those without the batch axis. Each anchor carries
/// `cx, cy, w, h` followed by `num_classes` scores; any trailing columns (mask
/// coefficients of segmentation exports) are ignored. Steps:
/// 1. Take the best class per anchor and drop anchors under `score_threshold`.
/// 2. Convert to corner boxes and scale by `scale_x`/`scale_y`.
/// 3. Sort by score and run per-class NMS.
/// 4. Keep at most `top_k`.
pub fn apply_postprocess(
    output: &Tensor,
    scale_x: f32,
    scale_y: f32,
    config: &PostprocessConfig,
) -> Result<Vec<Detection>> {
    anyhow::ensure!(config.num_classes > 0, "num_classes must be greater than zero");
    let predictions = prediction_view(output, config.num_classes)?;

    let class_end = 4 + config.num_classes;
    let mut detections = Vec::new();
    for anchor in 0..predictions.anchors {
        let (best_class, best_score) = (4..class_end)
            .map(|feature| (feature - 4, predictions.get(anchor, feature)))
            .fold((0usize, f32::NEG_INFINITY), |best, candidate| {
                if candidate.1 > best.1 { candidate } else { best }
            });
        if !best_score.is_finite() || best_score < config.score_threshold {
            continue;
        }

        let cx = predictions.get(anchor, 0);
        let cy = predictions.get(anchor, 1);
        let w = predictions.get(anchor, 2);
        let h = predictions.get(anchor, 3);
        if ![cx, cy, w, h].iter().all(|v| v.is_finite()) || w <= 0.0 || h <= 0.0 {
            continue;
        }

        let model_box = BoundingBox::from_center(cx, cy, w, h);
        let bbox = BoundingBox::new(
            model_box.x1 * scale_x,
            model_box.y1 * scale_y,
            model_box.x2 * scale_x,
            model_box.y2 * scale_y,
        );

        detections.push(Detection {
            bbox,
            class_id: best_class as u32,
            confidence: best_score,
        });
    }

    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    if config.nms_threshold > 0.0 && detections.len() > 1 {
        detections = non_max_suppression(detections, config.nms_threshold);
    }

    if config.top_k > 0 && detections.len() > config.top_k {
        detections.truncate(config.top_k);
    }

    Ok(detections)
}

/// Work out the prediction layout from the tensor shape.
fn prediction_view(output: &Tensor, num_classes: usize) -> Result<Predictions<'_>> {
    let (a, b) = match output.shape() {
        [1, a, b] | [a, b] => (*a, *b),
        other => anyhow::bail!(
            "YOLO output must have shape [1, F, N], [1, N, F], [F, N] or [N, F] (got {:?})",
            other
        ),
    };

    let min_features = 4 + num_classes;
    // Exports put the short feature axis first; fall back to whichever side is wide enough.
    let features_first = if a >= min_features && b >= min_features {
        a <= b
    } else if a >= min_features {
        true
    } else if b >= min_features {
        false
    } else {
        anyhow::bail!(
            "YOLO output {:?} has fewer than {} features per anchor",
            output.shape(),
            min_features
        );
    };
    let (features, anchors) = if features_first { (a, b) } else { (b, a) };

    let data = output
        .as_slice::<f32>()
        .map_err(|e| anyhow::anyhow!("YOLO output is not f32: {e}"))?;
    anyhow::ensure!(
        data.len() == features * anchors,
        "YOLO output data is not contiguous"
    );

    Ok(Predictions {
        data,
        features,
        anchors,
        features_first,
    })
}

/// Greedy per-class NMS over detections sorted by descending confidence.
fn non_max_suppression(mut detections: Vec<Detection>, threshold: f32) -> Vec<Detection> {
    let mut result: Vec<Detection> = Vec::with_capacity(detections.len());
    for detection in detections.drain(..) {
        let suppressed = result.iter().any(|kept| {
            kept.class_id == detection.class_id && detection.bbox.iou(&kept.bbox) > threshold
        });
        if !suppressed {
            result.push(detection);
        }
    }
    result
}
