use crate::commands::{run_scan, ScanOptions};
use anyhow::{Context, Result};
use colored::*;
use gaxrip_core::{gax::GaxSong, Record, ScanStats, SubPointer, VersionInfo};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use tracing::info;

#[derive(Serialize)]
struct FoundSong {
    offset: usize,
    address: String,
    name: String,
    title: String,
    artist: String,
    channels: u16,
    samples: usize,
    sub_pointers: BTreeMap<SubPointer, String>,
}

impl From<&Record<GaxSong>> for FoundSong {
    fn from(record: &Record<GaxSong>) -> Self {
        Self {
            offset: record.offset,
            address: format!("{:#010X}", record.address),
            name: record.name.clone(),
            title: record.payload.parsed_name.clone(),
            artist: record.payload.parsed_artist.clone(),
            channels: record.payload.header.num_channels,
            samples: record.payload.samples.len(),
            sub_pointers: record
                .sub_pointers
                .iter()
                .map(|(kind, address)| (*kind, format!("{:#010X}", address)))
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ScanOutput<'a> {
    version: &'a VersionInfo,
    version_detected: bool,
    stats: &'a ScanStats,
    songs: Vec<FoundSong>,
}

/// Scan the ROM at `input` and list every recovered song
pub fn execute(
    input: &str,
    output: Option<&str>,
    options: &ScanOptions,
    quiet: bool,
) -> Result<()> {
    info!("Scanning file: {}", input);

    let report = run_scan(input, options, quiet)?;
    let stats = &report.stats;

    // Print statistics
    println!("\n=== Scan Results ===");
    println!(
        "Engine version:    {}{}",
        report.version,
        if report.version_detected { "" } else { " (assumed)" }
    );
    println!("Bytes scanned:     {} bytes", stats.bytes_scanned);
    println!("Pointer targets:   {}", stats.targets);
    println!("Trial decodes:     {}", stats.attempts);
    println!("Decode failures:   {}", stats.decode_failures);
    println!("Name rejections:   {}", stats.predicate_rejections);
    println!("Songs found:       {}", stats.accepted.to_string().green());
    println!(
        "Orphans recovered: {}",
        stats.orphans_recovered.to_string().green()
    );
    println!("Hit rate:          {:.4}%", stats.hit_rate());
    println!();

    let songs: Vec<FoundSong> = report.records.iter().map(FoundSong::from).collect();

    if let Some(output_path) = output {
        let out = ScanOutput {
            version: &report.version,
            version_detected: report.version_detected,
            stats,
            songs,
        };
        let json =
            serde_json::to_string_pretty(&out).with_context(|| "Failed to serialize scan report")?;

        fs::write(output_path, json)
            .with_context(|| format!("Failed to write output file: {}", output_path))?;

        info!("Scan report written to: {}", output_path);
    } else if songs.is_empty() {
        println!("{} No songs found", "✗".red());
    } else {
        println!("=== Songs ===");
        for song in &songs {
            println!(
                "{}: {} - {} ({} channels, {} samples)",
                song.address, song.title, song.artist, song.channels, song.samples
            );
        }
    }

    Ok(())
}
