use crate::commands::{load_config, load_image, ScanOptions};
use crate::progress::PhaseBars;
use anyhow::{Context, Result};
use colored::*;
use gaxrip_core::{gax::GaxDecoder, index::PointerIndex, prober::probe_version, VersionInfo};
use tracing::info;

/// Report the engine version marker of the ROM at `input`, if any
///
/// Only pointers inside the configured scan window are followed, so the
/// result matches what `scan` would detect under the same options.
pub fn execute(input: &str, options: &ScanOptions, quiet: bool) -> Result<Option<VersionInfo>> {
    info!("Probing file: {}", input);

    let config = load_config(options)?;
    let image = load_image(input, &config)?;
    let window = config
        .window_range(image.len())
        .context("Invalid scan window")?;

    let mut bars = PhaseBars::new(quiet);
    let index = PointerIndex::build_window(&image, window, &mut bars);
    let probed = probe_version(&image, &index, &GaxDecoder, &mut bars);
    bars.finish();

    println!("\n=== Version Probe ===");
    println!("Pointer targets:   {}", index.len());
    match probed {
        Some(found) => {
            println!(
                "{} GAX {} at {:#010X}",
                "✓".green(),
                found.version.to_string().bold(),
                image.address_of(found.offset)
            );
            println!("Marker:            {}", found.version.raw);
            Ok(Some(found.version))
        }
        None => {
            println!(
                "{} GAX version string not found. Assuming GAX version {}",
                "!".yellow(),
                config.default_version.major
            );
            Ok(None)
        }
    }
}
