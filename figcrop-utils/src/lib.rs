//! Common helpers shared across figcrop crates.

/// Application configuration and settings management.
pub mod config;
/// Image loading and coordinate scaling helpers.
pub mod image_utils;
/// Image output helpers (encoding, naming).
pub mod output;
/// Instrumentation helpers for optional performance tracing.
pub mod telemetry;

use std::path::Path;

use anyhow::Result;
use log::LevelFilter;

pub use config::{AppSettings, ResizeFilter, VariantMode};
pub use image_utils::{compute_resize_scales, load_image};
pub use output::{ImageFormatHint, OutputOptions, numbered_file_name, save_dynamic_image};
pub use telemetry::{
    TimingGuard, configure as configure_telemetry, telemetry_allows, telemetry_enabled,
    timing_guard, timing_guard_if,
};

/// Initialize logging once for the CLI.
///
/// `RUST_LOG` takes precedence; otherwise `default_filter` applies. Calling this
/// more than once is harmless.
pub fn init_logging(default_filter: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    builder.filter_module(telemetry::TELEMETRY_TARGET, LevelFilter::Trace);

    if builder.try_init().is_err() {
        // Logger already initialized; nothing to do.
    }
    Ok(())
}

/// Validate that a path exists and resolve it to an absolute path.
pub fn normalize_path<P: AsRef<Path>>(path: P) -> Result<std::path::PathBuf> {
    let path = path.as_ref();
    anyhow::ensure!(path.exists(), "path does not exist: {}", path.display());
    Ok(path.canonicalize()?)
}
