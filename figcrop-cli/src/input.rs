//! Loading base images and edited replacement crops.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use figcrop_core::{PipelineError, RegionManifest, Replacements};
use figcrop_utils::load_image;
use image::DynamicImage;
use log::{debug, warn};

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "bmp"];

/// Load the image the pipeline runs on. Failures here abort the run.
pub fn load_input(path: &Path) -> Result<DynamicImage> {
    load_image(path).map_err(|err| PipelineError::Input(format!("{err:#}")).into())
}

/// Find and load the edited crop for every region in `manifest`.
///
/// Each region is looked up first under the crop file name recorded in the
/// manifest, then as `<prefix>_<id>` with any supported image extension.
/// Regions without a readable file are left out.
pub fn load_replacements(dir: &Path, manifest: &RegionManifest, prefix: &str) -> Result<Replacements> {
    anyhow::ensure!(
        dir.is_dir(),
        "replacements directory does not exist: {}",
        dir.display()
    );

    let mut replacements = Replacements::new();
    for record in &manifest.regions {
        let Some(path) = find_replacement(dir, record.crop_file.as_deref(), prefix, record.id)?
        else {
            debug!("no replacement for region {} in {}", record.id, dir.display());
            continue;
        };
        match load_image(&path) {
            Ok(image) => {
                debug!("region {} <- {}", record.id, path.display());
                replacements.insert(record.id, image);
            }
            Err(err) => warn!("ignoring replacement {}: {err:#}", path.display()),
        }
    }
    Ok(replacements)
}

fn find_replacement(
    dir: &Path,
    recorded: Option<&str>,
    prefix: &str,
    id: u32,
) -> Result<Option<PathBuf>> {
    if let Some(name) = recorded {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
    }

    let stem = format!("{prefix}_{id}");
    let mut matches = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to read directory {}", dir.display()))?
    {
        let path = entry?.path();
        let stem_matches = path.file_stem().and_then(|s| s.to_str()) == Some(stem.as_str());
        let ext_matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if stem_matches && ext_matches && path.is_file() {
            matches.push(path);
        }
    }
    matches.sort();
    if matches.len() > 1 {
        warn!(
            "several replacements match {stem}; using {}",
            matches[0].display()
        );
    }
    Ok(matches.into_iter().next())
}
