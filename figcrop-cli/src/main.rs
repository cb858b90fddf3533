mod annotate;
mod args;
mod config;
mod crop;
mod detect;
mod detector;
mod input;
mod recompose;
mod types;

use anyhow::Result;
use clap::Parser;
use figcrop_utils::{configure_telemetry, init_logging};
use log::{LevelFilter, debug};

use crate::{
    args::{Cli, Command},
    config::{apply_global_overrides, load_settings},
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    })?;
    debug!("figcrop-core {}", figcrop_core::version());

    let mut settings = load_settings(cli.config.as_ref())?;
    apply_global_overrides(&mut settings, &cli);
    configure_telemetry(
        settings.telemetry.enabled,
        settings.telemetry.level_filter(),
    );

    match &cli.command {
        Command::Detect(args) => detect::run(args, &mut settings),
        Command::Crop(args) => crop::run(args, &mut settings),
        Command::Recompose(args) => recompose::run(args, &mut settings),
        Command::Annotate(args) => annotate::run(args, &mut settings),
    }
}
