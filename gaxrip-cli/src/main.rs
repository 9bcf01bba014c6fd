use anyhow::Result;
use clap::{Parser, Subcommand};
use gaxrip_cli::commands::{self, ScanOptions};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "gaxrip")]
#[command(about = "gaxrip - Find and extract GAX sound engine songs from GBA ROMs", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors, and hide progress bars
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the GAX engine version of a ROM
    Probe {
        /// ROM image to probe
        #[arg(short, long)]
        input: String,

        #[command(flatten)]
        options: ScanOptions,
    },

    /// Scan a ROM and list recovered songs
    Scan {
        /// ROM image to scan
        #[arg(short, long)]
        input: String,

        /// Output JSON file for the scan report
        #[arg(short, long)]
        output: Option<String>,

        #[command(flatten)]
        options: ScanOptions,
    },

    /// Scan a ROM and export songs and samples
    Extract {
        /// ROM image to extract from
        #[arg(short, long)]
        input: String,

        /// Output directory (defaults to the ROM file name without extension)
        #[arg(short, long)]
        output: Option<String>,

        /// Channel count written to exported WAV files
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..=2))]
        channels: Option<u16>,

        #[command(flatten)]
        options: ScanOptions,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if cli.quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Execute command
    match cli.command {
        Commands::Probe { input, options } => {
            commands::probe::execute(&input, &options, cli.quiet).map(|_| ())
        }

        Commands::Scan {
            input,
            output,
            options,
        } => commands::scan::execute(&input, output.as_deref(), &options, cli.quiet),

        Commands::Extract {
            input,
            output,
            channels,
            options,
        } => commands::extract::execute(&input, output.as_deref(), channels, &options, cli.quiet)
            .map(|_| ()),
    }
}
