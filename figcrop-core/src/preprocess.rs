//! Preprocessing for YOLO inference.
//!
//! Images are stretched to the model input size (no letterbox), converted to RGB,
//! scaled to `[0, 1]` and laid out as a `[1, 3, H, W]` tensor. The scale factors
//! needed to map boxes back to the source image travel alongside the tensor.

use std::borrow::Cow;

use anyhow::Result;
use figcrop_utils::{compute_resize_scales, config::DetectionSettings, timing_guard};
use image::{DynamicImage, GenericImageView, RgbImage, imageops::FilterType};
use tract_onnx::prelude::Tensor;

/// Model input resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSize {
    pub width: u32,
    pub height: u32,
}

impl InputSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for InputSize {
    fn default() -> Self {
        Self {
            width: 640,
            height: 640,
        }
    }
}

/// Configuration for preparing an image before inference.
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    pub input_size: InputSize,
    /// Filter used to stretch the image to the input size.
    pub filter: FilterType,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            input_size: InputSize::default(),
            filter: FilterType::Triangle,
        }
    }
}

impl From<&DetectionSettings> for PreprocessConfig {
    fn from(settings: &DetectionSettings) -> Self {
        PreprocessConfig {
            input_size: InputSize::new(settings.input_width, settings.input_height),
            ..Default::default()
        }
    }
}

/// Output of preprocessing: tensor plus metadata for rescaling detections.
#[derive(Debug)]
pub struct PreprocessOutput {
    /// Normalized RGB tensor shaped `[1, 3, H, W]`.
    pub tensor: Tensor,
    /// Multiply model-space x coordinates by this to get source pixels.
    pub scale_x: f32,
    /// Multiply model-space y coordinates by this to get source pixels.
    pub scale_y: f32,
    pub original_size: (u32, u32),
}

/// Convert an in-memory image into a YOLO-ready tensor.
pub fn preprocess_image(image: &DynamicImage, config: &PreprocessConfig) -> Result<PreprocessOutput> {
    let _guard = timing_guard("figcrop_core::preprocess_image", log::Level::Trace);
    let input_w = config.input_size.width;
    let input_h = config.input_size.height;
    anyhow::ensure!(
        input_w > 0 && input_h > 0,
        "input dimensions must be greater than zero"
    );

    let (orig_w, orig_h) = image.dimensions();
    anyhow::ensure!(
        orig_w > 0 && orig_h > 0,
        "source image dimensions must be greater than zero"
    );

    let resized: Cow<'_, RgbImage> = if orig_w == input_w && orig_h == input_h {
        match image.as_rgb8() {
            Some(rgb) => Cow::Borrowed(rgb),
            None => Cow::Owned(image.to_rgb8()),
        }
    } else {
        Cow::Owned(
            image
                .resize_exact(input_w, input_h, config.filter)
                .to_rgb8(),
        )
    };

    let data = rgb_to_normalized_chw(&resized);
    let shape = [1usize, 3, input_h as usize, input_w as usize];
    let tensor = Tensor::from_shape(&shape, &data)
        .map_err(|e| anyhow::anyhow!("failed to build tensor: {e}"))?;

    let (scale_x, scale_y) = compute_resize_scales((orig_w, orig_h), (input_w, input_h))?;

    Ok(PreprocessOutput {
        tensor,
        scale_x,
        scale_y,
        original_size: (orig_w, orig_h),
    })
}

/// Planar RGB in `[0, 1]`, channel-major.
fn rgb_to_normalized_chw(image: &RgbImage) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let plane = width as usize * height as usize;
    let mut data = vec![0.0f32; plane * 3];
    for (index, pixel) in image.pixels().enumerate() {
        for channel in 0..3 {
            data[channel * plane + index] = f32::from(pixel[channel]) / 255.0;
        }
    }
    data
}
