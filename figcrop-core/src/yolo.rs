use std::path::Path;

use anyhow::Result;
use figcrop_utils::{config::DetectionSettings, timing_guard};
use image::DynamicImage;

use crate::{
    detector::{Detection, Detector},
    error::PipelineError,
    model::YoloModel,
    postprocess::{PostprocessConfig, apply_postprocess},
    preprocess::{PreprocessConfig, preprocess_image},
};

/// [`Detector`] backed by a YOLOv8-family ONNX export run through tract.
///
/// Returns every decoded class; selecting people is left to the selector.
#[derive(Debug)]
pub struct YoloDetector {
    model: YoloModel,
    preprocess: PreprocessConfig,
    postprocess: PostprocessConfig,
}

impl YoloDetector {
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        preprocess: PreprocessConfig,
        postprocess: PostprocessConfig,
    ) -> Result<Self> {
        let model = YoloModel::load(model_path, preprocess.input_size)?;
        Ok(Self {
            model,
            preprocess,
            postprocess,
        })
    }

    /// Build a detector using the decoding parameters from settings.
    pub fn from_settings<P: AsRef<Path>>(model_path: P, settings: &DetectionSettings) -> Result<Self> {
        Self::new(model_path, settings.into(), settings.into())
    }

    pub fn postprocess_config(&self) -> &PostprocessConfig {
        &self.postprocess
    }

    pub fn preprocess_config(&self) -> &PreprocessConfig {
        &self.preprocess
    }

    fn run(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        let prep = preprocess_image(image, &self.preprocess)?;

        let raw = {
            let _guard = timing_guard("figcrop_core::onnx_inference", log::Level::Debug);
            self.model.run(&prep.tensor)?
        };

        let _guard = timing_guard("figcrop_core::postprocess", log::Level::Debug);
        apply_postprocess(&raw, prep.scale_x, prep.scale_y, &self.postprocess)
    }
}

impl Detector for YoloDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>, PipelineError> {
        self.run(image)
            .map_err(|err| PipelineError::Detector(format!("{err:#}")))
    }
}
