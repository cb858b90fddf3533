use std::path::Path;

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};

/// Load an image from disk into memory.
///
/// Fails when the file cannot be opened or decoded, or when it decodes to a
/// zero-sized buffer.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    let path_ref = path.as_ref();
    let image = image::open(path_ref)
        .with_context(|| format!("failed to open image {}", path_ref.display()))?;
    let (width, height) = image.dimensions();
    anyhow::ensure!(
        width > 0 && height > 0,
        "image {} has zero dimensions ({width}x{height})",
        path_ref.display()
    );
    Ok(image)
}

/// Compute scale factors that map model-space coordinates back to the source image.
///
/// # Arguments
///
/// * `original` - The source image's (width, height).
/// * `target` - The resized image's (width, height).
pub fn compute_resize_scales(original: (u32, u32), target: (u32, u32)) -> Result<(f32, f32)> {
    let (orig_w, orig_h) = original;
    let (target_w, target_h) = target;
    anyhow::ensure!(
        target_w > 0 && target_h > 0,
        "target dimensions must be non-zero"
    );
    anyhow::ensure!(
        orig_w > 0 && orig_h > 0,
        "original dimensions must be non-zero"
    );
    Ok((
        orig_w as f32 / target_w as f32,
        orig_h as f32 / target_h as f32,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn compute_resize_scales_returns_expected_values() {
        let (sx, sy) = compute_resize_scales((1280, 960), (640, 640)).unwrap();
        assert_eq!(sx, 2.0);
        assert_eq!(sy, 1.5);
    }

    #[test]
    fn compute_resize_scales_rejects_zero() {
        assert!(compute_resize_scales((0, 480), (320, 240)).is_err());
        assert!(compute_resize_scales((640, 480), (0, 240)).is_err());
    }

    #[test]
    fn load_image_reads_png_and_rejects_garbage() {
        let dir = tempdir().expect("tempdir");
        let good = dir.path().join("scene.png");
        RgbImage::from_pixel(12, 8, Rgb([10, 20, 30]))
            .save(&good)
            .expect("save png");
        let loaded = load_image(&good).expect("load png");
        assert_eq!(loaded.dimensions(), (12, 8));

        let bad = dir.path().join("broken.png");
        std::fs::write(&bad, b"definitely not a png").expect("write junk");
        assert!(load_image(&bad).is_err());
        assert!(load_image(dir.path().join("missing.png")).is_err());
    }
}
