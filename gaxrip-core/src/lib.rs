//! # gaxrip Core
//!
//! Heuristic recovery of GAX sound engine songs from headerless GBA ROM images.
//!
//! ## Modules
//!
//! - `image`: ROM image loading and bounded little-endian reads
//! - `index`: Reverse pointer index over every aligned cell
//! - `attempt`: Per-trial decode context and all-or-nothing commit
//! - `decoder`: Pluggable record decoder and acceptance predicate
//! - `gax`: GAX song header decoder for both engine layouts
//! - `prober`: Version marker discovery
//! - `scanner`: Trial decoding of every pointer target
//! - `orphan`: Recovery of unreferenced songs via back-reference chains
//! - `dedup`: Disambiguation of shared song names
//! - `pipeline`: The whole session, from raw bytes to a report
//! - `builder`: Synthetic ROM construction for tests and benchmarks

#![warn(missing_docs)]

pub mod attempt;
pub mod builder;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod dedup;
pub mod error;
pub mod gax;
pub mod image;
pub mod index;
pub mod orphan;
pub mod pipeline;
pub mod prober;
pub mod progress;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use attempt::{attempt, Attempt, AttemptContext, Rejection};
pub use config::{ScanConfig, ScanWindow};
pub use decoder::Decoder;
pub use error::{DecodeError, ScanError};
pub use gax::{GaxDecoder, GaxSong};
pub use image::Image;
pub use index::PointerIndex;
pub use orphan::{default_profiles, ChainProfile, VersionMatch};
pub use pipeline::{Pipeline, ScanReport};
pub use progress::{NoProgress, Phase, Progress, ProgressSink};
pub use scanner::ScanStats;
pub use types::{Record, RecordSet, SubPointer, VersionInfo};

/// Result type alias for gaxrip operations
pub type Result<T> = core::result::Result<T, ScanError>;
