//! `figcrop recompose`: paste edited crops back into the base image.

use std::{
    fs,
    sync::atomic::{AtomicUsize, Ordering},
};

use anyhow::{Context, Result};
use figcrop_core::{
    ExplicitPolicies, FrameSize, InclusionPolicy, PolicyGenerator, Recompositor, RegionManifest,
    VariantDriver, generator_for,
};
use figcrop_utils::{OutputOptions, config::AppSettings, save_dynamic_image};
use log::{info, warn};

use crate::{
    args::RecomposeArgs,
    config::apply_recompose_overrides,
    input::{load_input, load_replacements},
};

pub fn run(args: &RecomposeArgs, settings: &mut AppSettings) -> Result<()> {
    apply_recompose_overrides(settings, args);

    let base = load_input(&args.base)?;
    let manifest = RegionManifest::load_from_path(&args.manifest)?;
    let frame = FrameSize::of(&base);
    if manifest.frame() != frame {
        warn!(
            "manifest was written for a {}x{} image but {} is {}x{}",
            manifest.image_width,
            manifest.image_height,
            args.base.display(),
            frame.width,
            frame.height
        );
    }

    let replacements =
        load_replacements(&args.replacements, &manifest, &settings.crop.file_prefix)?;
    info!(
        "Loaded {} replacement(s) for {} region(s)",
        replacements.len(),
        manifest.regions.len()
    );

    let generator: Box<dyn PolicyGenerator> = if args.only.is_empty() {
        generator_for(settings.recompose.mode, &settings.recompose.policies)
    } else {
        Box::new(ExplicitPolicies(vec![only_policy(&args.only)]))
    };

    fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            args.output_dir.display()
        )
    })?;
    let options = OutputOptions::new(&settings.recompose.output_format, settings.crop.jpeg_quality);

    let regions = manifest.region_table();
    let driver = VariantDriver::new(&base, &regions, &replacements)
        .with_recompositor(Recompositor::from(settings.recompose.resize_filter));
    let saved = AtomicUsize::new(0);
    let unsaved = AtomicUsize::new(0);
    let failures = driver.for_each_variant(
        generator.as_ref(),
        settings.recompose.parallel,
        |variant| {
            let path = args
                .output_dir
                .join(format!("{}.{}", variant.label, options.format.extension()));
            match save_dynamic_image(&variant.image, &path, &options) {
                Ok(()) => {
                    saved.fetch_add(1, Ordering::Relaxed);
                    info!("Saved {} ({:?})", path.display(), variant.include);
                }
                Err(err) => {
                    unsaved.fetch_add(1, Ordering::Relaxed);
                    warn!("failed to save variant '{}': {err:#}", variant.label);
                }
            }
        },
    );

    let saved = saved.into_inner();
    let unsaved = unsaved.into_inner();
    if saved + unsaved == 0 {
        if failures.is_empty() {
            warn!("no variants to render; check the replacements directory");
            return Ok(());
        }
        anyhow::bail!("all {} variant(s) failed", failures.len());
    }
    if unsaved > 0 {
        anyhow::bail!("{unsaved} variant(s) could not be saved; {saved} written");
    }
    Ok(())
}

/// Single policy for `--only`, labelled `only_<id>_<id>...`.
fn only_policy(ids: &[u32]) -> InclusionPolicy {
    let policy = InclusionPolicy::new(String::new(), ids.iter().copied());
    let suffix: Vec<String> = policy.include.iter().map(u32::to_string).collect();
    InclusionPolicy {
        label: format!("only_{}", suffix.join("_")),
        include: policy.include,
    }
}
