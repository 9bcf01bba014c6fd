//! Constants and limits for GAX ROM scanning

/// Address at which GBA cartridge ROM is mapped
pub const ROM_BASE_ADDRESS: u32 = 0x0800_0000;

/// Size of a pointer cell in bytes
pub const POINTER_SIZE: usize = 4;

/// Alignment assumed for pointer cells and structure headers
pub const POINTER_ALIGN: usize = 4;

/// Largest image accepted by default (128 MiB, the size of the GBA ROM window)
pub const MAX_IMAGE_SIZE: u64 = 128 * 1024 * 1024;

/// Progress checkpoint interval while building the pointer index, in bytes
pub const INDEX_PROGRESS_INTERVAL: usize = 1 << 16;

/// Progress checkpoint interval while visiting pointer targets
pub const TARGET_PROGRESS_INTERVAL: usize = 16;

/// Names must be strictly longer than this to be accepted
pub const MIN_NAME_LEN: usize = 4;

/// Marker separating the quoted title from the artist in a song name
pub const NAME_DELIMITER: &str = "\" © ";

/// Prefix every version marker starts with
pub const VERSION_PREFIX: &str = "GAX Sound Engine ";

/// Longest version marker read, including the terminator
pub const MAX_VERSION_STRING_LEN: usize = 64;

/// Longest song name read, including the terminator
pub const MAX_NAME_LEN: usize = 256;

/// Major version assumed when no version marker is found
pub const DEFAULT_MAJOR_VERSION: u8 = 3;

/// Song header size shared by both layouts (before the channel table)
pub const SONG_HEADER_SIZE: usize = 0x20;

/// Most channels a song may declare
pub const MAX_CHANNELS: u16 = 32;

/// Most rows a pattern may hold
pub const MAX_ROWS_PER_PATTERN: u16 = 256;

/// Most patterns a channel may hold
pub const MAX_PATTERNS_PER_CHANNEL: u16 = 256;

/// Most FX channels a current-layout song may declare
pub const MAX_FX_CHANNELS: u8 = 4;

/// Most entries read from a sample set before giving up on a terminator
pub const MAX_SAMPLES: usize = 256;

/// Size of one sample set entry (data pointer + length)
pub const SAMPLE_ENTRY_SIZE: usize = 8;

/// Playback rate of exported samples, in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 15769;

/// Channel count of exported samples
pub const DEFAULT_EXPORT_CHANNELS: u16 = 2;

/// Offset of the sequence data pointer in a song header
pub const SEQUENCE_FIELD: usize = 0x0C;

/// Offset of the instrument set pointer in a song header
pub const INSTRUMENT_SET_FIELD: usize = 0x10;

/// Offset of the sample set pointer in a song header
pub const SAMPLE_SET_FIELD: usize = 0x14;

/// Offset of the name pointer in a legacy song header
pub const LEGACY_NAME_FIELD: usize = 0x1C;

/// Offset of the instrument set pointer inside a legacy sound handler
pub const LEGACY_HANDLER_INSTRUMENT_FIELD: i32 = 0x08;

/// Offset of the sound handler pointer inside a legacy sequence block
pub const LEGACY_SEQUENCE_HANDLER_FIELD: i32 = 0x04;

/// Header growth observed on the 2.02B engine build
pub const LEGACY_2_02B_HEADER_CORRECTION: i32 = 4;
