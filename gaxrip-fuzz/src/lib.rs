//! Fuzzing entry points for gaxrip-core
//!
//! To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Run fuzzer: cargo fuzz run fuzz_scan

use gaxrip_core::{
    attempt, decoder::decode_accepted, gax::parse_version_marker, pipeline::run, GaxDecoder,
    Image, NoProgress, ScanConfig, VersionInfo,
};

/// Decode a song at every aligned offset of the first kilobyte, for each layout
pub fn fuzz_decode(data: &[u8]) {
    let Ok(image) = Image::from_rom(data.to_vec()) else {
        return;
    };

    for major in 1..=3 {
        let version = VersionInfo::assumed(major);
        for offset in (0..image.len().min(1024)).step_by(4) {
            // Should reject or accept, never panic
            let _ = attempt(offset, |ctx| {
                decode_accepted(&GaxDecoder, &image, offset, &version, ctx)
            });
        }
    }
}

/// Run the whole pipeline over arbitrary bytes
pub fn fuzz_scan(data: &[u8]) {
    let Ok(image) = Image::from_rom(data.to_vec()) else {
        return;
    };

    // Only configuration problems may fail, and the default configuration has none
    let _ = run(&image, &GaxDecoder, &ScanConfig::default(), &mut NoProgress);
}

/// Parse arbitrary bytes as a version marker
pub fn fuzz_version(data: &[u8]) {
    let _ = parse_version_marker(data);
}
