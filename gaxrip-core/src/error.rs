//! Error types for gaxrip operations

use thiserror::Error;

/// Fatal errors that stop a scan before or while it runs
#[derive(Debug, Error)]
pub enum ScanError {
    /// IO error while loading the image
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The image holds no bytes
    #[error("Image is empty")]
    EmptyImage,

    /// The image exceeds the configured size limit
    #[error("Image size {found} exceeds maximum {limit}")]
    ImageTooLarge {
        /// The configured limit in bytes.
        limit: u64,
        /// The size of the rejected image.
        found: u64,
    },

    /// The scan window does not fit the image
    #[error("Scan window {start:#x}..{end:#x} does not fit an image of {len:#x} bytes")]
    BadWindow {
        /// First offset of the window.
        start: usize,
        /// One past the last offset of the window.
        end: usize,
        /// Length of the image.
        len: usize,
    },

    /// The base address leaves no room for the image in a 32-bit address space
    #[error("Base address {base:#010x} cannot map {len:#x} bytes")]
    BadBaseAddress {
        /// Configured base address.
        base: u32,
        /// Length of the image.
        len: usize,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Reasons a single decode attempt fails
///
/// These are expected outcomes of brute-force scanning and never stop a scan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A read ran past the end of the image
    #[error("Read of {len} bytes at offset {offset:#x} is out of bounds")]
    OutOfBounds {
        /// Offset of the attempted read.
        offset: usize,
        /// Number of bytes requested.
        len: usize,
    },

    /// A pointer does not resolve into the image
    #[error("Pointer {0:#010x} does not resolve into the image")]
    InvalidPointer(u32),

    /// A structure does not start on an aligned offset
    #[error("Structure at offset {0:#x} is misaligned")]
    Misaligned(usize),

    /// A header field holds an implausible value
    #[error("Field {field} out of range: {value}")]
    FieldOutOfRange {
        /// Name of the field.
        field: &'static str,
        /// The value read.
        value: u32,
    },

    /// A string is unterminated or holds unprintable characters
    #[error("Bad string at offset {0:#x}")]
    BadString(usize),

    /// No version marker at this offset
    #[error("No version marker")]
    NoVersionMarker,

    /// The decoder has no layout for this version
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u8),
}
