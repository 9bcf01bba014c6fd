//! Synthetic ROM construction
//!
//! Used by tests, benchmarks and fuzz seeds to lay out songs, version
//! markers and pointer chains at known offsets.

use crate::constants::{
    DEFAULT_SAMPLE_RATE, INSTRUMENT_SET_FIELD, LEGACY_NAME_FIELD, POINTER_ALIGN, POINTER_SIZE,
    ROM_BASE_ADDRESS, SAMPLE_ENTRY_SIZE, SAMPLE_SET_FIELD, SEQUENCE_FIELD, SONG_HEADER_SIZE,
};
use crate::error::ScanError;
use crate::gax::Layout;
use crate::image::Image;
use bytes::BytesMut;

/// Growable little-endian ROM buffer
///
/// Writes past the end grow the buffer with zeros. [`ImageBuilder::alloc`]
/// appends auxiliary structures after everything written so far.
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    data: BytesMut,
    base: u32,
}

impl ImageBuilder {
    /// Zero-filled image of `len` bytes at the ROM base address
    pub fn new(len: usize) -> Self {
        Self::with_base(len, ROM_BASE_ADDRESS)
    }

    /// Zero-filled image of `len` bytes at `base`
    pub fn with_base(len: usize, base: u32) -> Self {
        let mut data = BytesMut::with_capacity(len);
        data.resize(len, 0);
        Self { data, base }
    }

    /// Current length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Absolute address of `offset`
    pub fn address(&self, offset: usize) -> u32 {
        self.base.wrapping_add(offset as u32)
    }

    fn ensure(&mut self, end: usize) {
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
    }

    /// Write raw bytes
    pub fn put_bytes(&mut self, offset: usize, bytes: &[u8]) -> &mut Self {
        self.ensure(offset + bytes.len());
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    /// Write a byte
    pub fn put_u8(&mut self, offset: usize, value: u8) -> &mut Self {
        self.put_bytes(offset, &[value])
    }

    /// Write a little-endian u16
    pub fn put_u16(&mut self, offset: usize, value: u16) -> &mut Self {
        self.put_bytes(offset, &value.to_le_bytes())
    }

    /// Write a little-endian u32
    pub fn put_u32(&mut self, offset: usize, value: u32) -> &mut Self {
        self.put_bytes(offset, &value.to_le_bytes())
    }

    /// Write a pointer cell at `offset` that resolves to `target`
    pub fn put_pointer(&mut self, offset: usize, target: usize) -> &mut Self {
        let address = self.address(target);
        self.put_u32(offset, address)
    }

    /// Write a NUL-terminated version marker
    pub fn put_version_marker(&mut self, offset: usize, marker: &str) -> &mut Self {
        self.put_bytes(offset, marker.as_bytes());
        self.put_u8(offset + marker.len(), 0)
    }

    /// Reserve `len` aligned bytes after the current end, returning their offset
    pub fn alloc(&mut self, len: usize) -> usize {
        let offset = self.data.len().next_multiple_of(POINTER_ALIGN);
        self.ensure(offset + len.max(1));
        offset
    }

    /// Reserve and fill bytes after the current end, returning their offset
    pub fn alloc_bytes(&mut self, bytes: &[u8]) -> usize {
        let offset = self.alloc(bytes.len());
        self.put_bytes(offset, bytes);
        offset
    }

    /// Freeze into an [`Image`]
    pub fn build(self) -> Result<Image, ScanError> {
        Image::new(self.data.freeze(), self.base)
    }
}

/// Where a written song and its sub-structures landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrittenSong {
    /// Offset of the song header
    pub offset: usize,
    /// Absolute address of the song header
    pub address: u32,
    /// Absolute address of the sequence data
    pub sequence_data: u32,
    /// Absolute address of the instrument set
    pub instrument_set: u32,
    /// Absolute address of the sample set
    pub sample_set: u32,
}

/// Builder for a GAX song header and the structures it references
#[derive(Debug, Clone)]
pub struct SongBuilder {
    layout: Layout,
    name: String,
    channels: u16,
    rows: u16,
    patterns: u16,
    sample_rate: u16,
    samples: Vec<Vec<u8>>,
    shared_table: bool,
    sequence_data: Option<u32>,
    instrument_set: Option<u32>,
}

impl SongBuilder {
    fn new(layout: Layout, name: &str) -> Self {
        Self {
            layout,
            name: name.to_string(),
            channels: 2,
            rows: 64,
            patterns: 2,
            sample_rate: DEFAULT_SAMPLE_RATE as u16,
            samples: Vec::new(),
            shared_table: false,
            sequence_data: None,
            instrument_set: None,
        }
    }

    /// A 3.x song
    pub fn current(name: &str) -> Self {
        Self::new(Layout::Current, name)
    }

    /// A pre-3.0 song
    pub fn legacy(name: &str) -> Self {
        Self::new(Layout::Legacy, name)
    }

    /// Set the channel count
    pub fn channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    /// Set the pattern-order length
    pub fn patterns(mut self, patterns: u16) -> Self {
        self.patterns = patterns;
        self
    }

    /// Set the mixing rate
    pub fn sample_rate(mut self, rate: u16) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Append a sample to the sample set
    pub fn sample(mut self, data: Vec<u8>) -> Self {
        self.samples.push(data);
        self
    }

    /// Point every channel at one shared pattern-order table
    pub fn shared_channel_table(mut self) -> Self {
        self.shared_table = true;
        self
    }

    /// Reuse an existing sequence data block instead of allocating one
    pub fn sequence_data(mut self, address: u32) -> Self {
        self.sequence_data = Some(address);
        self
    }

    /// Reuse an existing instrument set instead of allocating one
    pub fn instrument_set(mut self, address: u32) -> Self {
        self.instrument_set = Some(address);
        self
    }

    /// Size of the header including the channel table and, for 3.x songs, the name
    pub fn header_len(&self) -> usize {
        let table = SONG_HEADER_SIZE + usize::from(self.channels) * POINTER_SIZE;
        match self.layout {
            Layout::Legacy => table,
            Layout::Current => table + self.encoded_name().len() + 1,
        }
    }

    fn encoded_name(&self) -> Vec<u8> {
        let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(&self.name);
        bytes.into_owned()
    }

    /// Write the song header at `offset` and its sub-structures after the image end
    pub fn write(self, rom: &mut ImageBuilder, offset: usize) -> WrittenSong {
        // Reserve the header span first so allocations never land inside it
        rom.ensure(offset + self.header_len());

        let sequence_data = self.sequence_data.unwrap_or_else(|| {
            let block = rom.alloc(16);
            rom.address(block)
        });
        let instrument_set = self.instrument_set.unwrap_or_else(|| {
            let set = rom.alloc(16);
            rom.address(set)
        });

        let mut sample_entries = Vec::with_capacity(self.samples.len());
        for data in &self.samples {
            let at = rom.alloc_bytes(data);
            sample_entries.push((rom.address(at), data.len() as u32));
        }
        let sample_set = rom.alloc((sample_entries.len() + 1) * SAMPLE_ENTRY_SIZE);
        for (i, (address, len)) in sample_entries.iter().enumerate() {
            let entry = sample_set + i * SAMPLE_ENTRY_SIZE;
            rom.put_u32(entry, *address);
            rom.put_u32(entry + POINTER_SIZE, *len);
        }

        let table_len = usize::from(self.patterns) * 4;
        let shared = rom.alloc(table_len);
        let table_start = offset + SONG_HEADER_SIZE;
        for channel in 0..usize::from(self.channels) {
            let table = if self.shared_table || channel == 0 {
                shared
            } else {
                rom.alloc(table_len)
            };
            for step in 0..usize::from(self.patterns) {
                rom.put_u16(table + step * 4, (channel * 16 + step) as u16);
            }
            rom.put_pointer(table_start + channel * POINTER_SIZE, table);
        }

        rom.put_u16(offset, self.channels)
            .put_u16(offset + 0x02, self.rows)
            .put_u16(offset + 0x04, self.patterns)
            .put_u16(offset + 0x06, 0)
            .put_u16(offset + 0x08, 0x100)
            .put_u32(offset + SEQUENCE_FIELD, sequence_data)
            .put_u32(offset + INSTRUMENT_SET_FIELD, instrument_set)
            .put_pointer(offset + SAMPLE_SET_FIELD, sample_set)
            .put_u16(offset + 0x18, self.sample_rate);

        let mut name = self.encoded_name();
        name.push(0);
        match self.layout {
            Layout::Legacy => {
                let at = rom.alloc_bytes(&name);
                rom.put_pointer(offset + LEGACY_NAME_FIELD, at);
            }
            Layout::Current => {
                rom.put_u16(offset + 0x1A, self.sample_rate)
                    .put_u8(offset + 0x1C, 1);
                let name_at = table_start + usize::from(self.channels) * POINTER_SIZE;
                rom.put_bytes(name_at, &name);
            }
        }

        WrittenSong {
            offset,
            address: rom.address(offset),
            sequence_data,
            instrument_set,
            sample_set: rom.address(sample_set),
        }
    }
}
