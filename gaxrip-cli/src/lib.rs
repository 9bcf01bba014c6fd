//! Library entry for gaxrip-cli used by integration tests and embedding.

pub mod commands;
pub mod export;
pub mod progress;

// Re-export commands for convenience
pub use commands::*;
