//! Command-line argument definitions for figcrop.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use figcrop_utils::{ResizeFilter, VariantMode};

/// Detect people in an image, cut padded crops around them and recompose edited
/// crops back into the scene.
#[derive(Debug, Parser)]
#[command(name = "figcrop", author, version, about)]
pub struct Cli {
    /// Optional settings JSON. Defaults to `config/figcrop.json` when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    pub verbose: bool,

    /// Enable telemetry timing logs (defaults to settings file).
    #[arg(long, global = true, action = ArgAction::SetTrue)]
    pub telemetry: bool,

    /// Override telemetry logging level (error, warn, info, debug, trace).
    #[arg(long, global = true, value_name = "LEVEL")]
    pub telemetry_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the detector and print every detection as JSON.
    Detect(DetectArgs),
    /// Select people, save padded crops and write the region manifest.
    Crop(CropArgs),
    /// Paste edited crops back into the base image, one output per variant.
    Recompose(RecomposeArgs),
    /// Draw region boxes over the input image.
    Annotate(AnnotateArgs),
}

/// Where detections come from: an ONNX model or a JSON file of boxes.
#[derive(Debug, Clone, Args)]
pub struct DetectorArgs {
    /// Path to a YOLO ONNX export (defaults to `model_path` from settings).
    #[arg(short, long, conflicts_with = "detections")]
    pub model: Option<PathBuf>,

    /// JSON file with precomputed detections (`[{"bbox": [x1, y1, x2, y2], "class_id": 0, "confidence": 0.9}]`).
    #[arg(long, value_name = "JSON")]
    pub detections: Option<PathBuf>,

    /// Override model input width (pixels).
    #[arg(long)]
    pub width: Option<u32>,

    /// Override model input height (pixels).
    #[arg(long)]
    pub height: Option<u32>,

    /// Override the minimum class score kept while decoding model output.
    #[arg(long)]
    pub score_threshold: Option<f32>,

    /// Override NMS IoU threshold.
    #[arg(long)]
    pub nms_threshold: Option<f32>,

    /// Override top_k limit.
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Number of class scores in the model output.
    #[arg(long)]
    pub num_classes: Option<usize>,
}

/// Which detections become regions.
#[derive(Debug, Clone, Args)]
pub struct SelectionArgs {
    /// Keep detections scoring strictly above this value.
    #[arg(long)]
    pub confidence_threshold: Option<f32>,

    /// Class id to keep (0 = person).
    #[arg(long)]
    pub target_class: Option<u32>,

    /// Fraction of each box's width/height added on every side.
    #[arg(long, allow_hyphen_values = true)]
    pub pad_fraction: Option<f64>,
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    /// Input image.
    #[arg(short, long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub detector: DetectorArgs,

    /// Write detections to a JSON file instead of stdout.
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CropArgs {
    /// Input image.
    #[arg(short, long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub detector: DetectorArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Directory for crops and the region manifest.
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Crop file format: jpg, png or webp.
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1-100).
    #[arg(long)]
    pub jpeg_quality: Option<u8>,

    /// Crop file name prefix (`<prefix>_<id>.<ext>`).
    #[arg(long)]
    pub prefix: Option<String>,
}

#[derive(Debug, Args)]
pub struct RecomposeArgs {
    /// The original image the crops were taken from.
    #[arg(short, long)]
    pub base: PathBuf,

    /// Region manifest written by `figcrop crop`.
    #[arg(long)]
    pub manifest: PathBuf,

    /// Directory holding edited crops named `<prefix>_<id>.<ext>`.
    #[arg(short, long)]
    pub replacements: PathBuf,

    /// Directory for the rendered variants.
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Variant family: exclude-each, include-each or all.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<VariantMode>,

    /// Render a single variant replacing exactly these ids (comma separated).
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<u32>,

    /// Resize filter: nearest, triangle, catmull-rom, gaussian or lanczos3.
    #[arg(long, value_name = "FILTER")]
    pub filter: Option<ResizeFilter>,

    /// Render variants in parallel.
    #[arg(long, action = ArgAction::SetTrue)]
    pub parallel: bool,

    /// Output format for variants: jpg, png or webp.
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Replacement file name prefix (defaults to the crop prefix).
    #[arg(long)]
    pub prefix: Option<String>,
}

#[derive(Debug, Args)]
pub struct AnnotateArgs {
    /// Input image.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Draw boxes from a region manifest instead of running a detector.
    #[arg(long, conflicts_with_all = ["model", "detections"])]
    pub manifest: Option<PathBuf>,

    #[command(flatten)]
    pub detector: DetectorArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Output image path; the format follows the extension.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Also draw the padded crop boxes.
    #[arg(long, action = ArgAction::SetTrue)]
    pub padded: bool,
}
