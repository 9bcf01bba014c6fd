use crate::commands::{run_scan, ScanOptions};
use crate::export::{export_all, ExportConfig, ExportTotals, WavExporter};
use anyhow::{Context, Result};
use colored::*;
use std::fs;
use tracing::info;

/// Scan the ROM at `input` and export every recovered song
///
/// Songs land under `output`, or in a directory named after the input
/// file's stem in the working directory. A song that fails to export is
/// logged and skipped.
pub fn execute(
    input: &str,
    output: Option<&str>,
    channels: Option<u16>,
    options: &ScanOptions,
    quiet: bool,
) -> Result<ExportTotals> {
    info!("Extracting from file: {}", input);

    let mut export = match output {
        Some(dir) => ExportConfig::new(dir),
        None => ExportConfig::for_input(input),
    };
    if let Some(channels) = channels {
        export.channels = channels;
    }

    let report = run_scan(input, options, quiet)?;

    fs::create_dir_all(&export.out_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            export.out_dir.display()
        )
    })?;
    info!(
        "Exporting {} songs to {}",
        report.records.len(),
        export.out_dir.display()
    );

    let exporter = WavExporter::new(export);
    let totals = export_all(&exporter, &report.records);

    println!("\n=== Extraction Results ===");
    println!("Engine version:    {}", report.version);
    println!("Songs exported:    {}", totals.exported.to_string().green());
    println!("Samples written:   {}", totals.samples);
    if totals.failed > 0 {
        println!("Failed songs:      {}", totals.failed.to_string().red());
    } else {
        println!("Failed songs:      {}", totals.failed);
    }
    println!("Output directory:  {}", exporter.config().out_dir.display());

    Ok(totals)
}
