//! Subcommands and the option handling they share

pub mod extract;
pub mod probe;
pub mod scan;

use crate::progress::PhaseBars;
use anyhow::{Context, Result};
use gaxrip_core::{
    gax::{GaxDecoder, GaxSong},
    pipeline::Pipeline,
    Image, ScanConfig, ScanReport, VersionInfo,
};
use std::fs;
use tracing::{debug, info};

/// Scan settings accepted by every scanning subcommand
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ScanOptions {
    /// JSON file with scan settings
    #[arg(long)]
    pub config: Option<String>,

    /// Address the first ROM byte is mapped at (hex with 0x prefix, or decimal)
    #[arg(long, value_parser = parse_address)]
    pub base: Option<u32>,

    /// Major engine version assumed when the ROM carries no version string
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub default_version: Option<u8>,

    /// Skip the back-reference search for unreferenced songs
    #[arg(long)]
    pub no_orphans: bool,
}

/// Parse an address such as `0x08000000` or `134217728`
pub fn parse_address(text: &str) -> Result<u32, String> {
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("invalid address {:?}: {}", text, e))
}

/// Build the effective scan configuration: file first, then flag overrides
pub fn load_config(options: &ScanOptions) -> Result<ScanConfig> {
    let mut config = match &options.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse config file: {}", path))?
        }
        None => ScanConfig::default(),
    };

    if let Some(base) = options.base {
        config.base_address = base;
    }
    if let Some(major) = options.default_version {
        config.default_version = VersionInfo::assumed(major);
    }
    if options.no_orphans {
        config.find_orphans = false;
    }

    config.validate().context("Invalid scan configuration")?;
    debug!("Scan configuration: {:?}", config);
    Ok(config)
}

/// Load the ROM at `input` under `config`'s base address and size limit
pub fn load_image(input: &str, config: &ScanConfig) -> Result<Image> {
    let image = Image::load(input, config.base_address, config.max_image_size)
        .with_context(|| format!("Failed to read input file: {}", input))?;

    info!("File size: {} bytes", image.len());
    Ok(image)
}

/// Load, scan and report on the ROM at `input`
pub fn run_scan(input: &str, options: &ScanOptions, quiet: bool) -> Result<ScanReport<GaxSong>> {
    let config = load_config(options)?;
    let image = load_image(input, &config)?;

    let mut bars = PhaseBars::new(quiet);
    let report = Pipeline::new(&GaxDecoder, &config)
        .run(&image, &mut bars)
        .with_context(|| format!("Failed to scan input file: {}", input))?;
    bars.finish();

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x08000000"), Ok(0x0800_0000));
        assert_eq!(parse_address("0X10"), Ok(0x10));
        assert_eq!(parse_address("4096"), Ok(4096));
        assert!(parse_address("0xZZ").is_err());
        assert!(parse_address("").is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let options = ScanOptions {
            base: Some(0x0200_0000),
            default_version: Some(2),
            no_orphans: true,
            ..Default::default()
        };
        let config = load_config(&options).unwrap();

        assert_eq!(config.base_address, 0x0200_0000);
        assert_eq!(config.default_version.major, 2);
        assert!(!config.find_orphans);
    }
}
