//! Immutable ROM image with little-endian pointer resolution

use crate::constants::{POINTER_SIZE, ROM_BASE_ADDRESS};
use crate::error::{DecodeError, ScanError};
use bytes::Bytes;
use std::path::Path;

#[cfg(feature = "logging")]
use tracing::debug;

/// A byte buffer mapped at a base address
///
/// All reads are bounds-checked and report [`DecodeError::OutOfBounds`]
/// instead of panicking, so decoders can probe arbitrary offsets.
#[derive(Debug, Clone)]
pub struct Image {
    data: Bytes,
    base: u32,
}

impl Image {
    /// Wrap an in-memory buffer mapped at `base`
    pub fn new(data: impl Into<Bytes>, base: u32) -> Result<Self, ScanError> {
        let data = data.into();
        if data.is_empty() {
            return Err(ScanError::EmptyImage);
        }
        // Every offset must map to a distinct 32-bit address
        if u64::from(base) + data.len() as u64 > u64::from(u32::MAX) + 1 {
            return Err(ScanError::BadBaseAddress {
                base,
                len: data.len(),
            });
        }
        Ok(Self { data, base })
    }

    /// Wrap an in-memory buffer at the GBA ROM base address
    pub fn from_rom(data: impl Into<Bytes>) -> Result<Self, ScanError> {
        Self::new(data, ROM_BASE_ADDRESS)
    }

    /// Load an image file, refusing files over `max_size` bytes
    pub fn load(path: impl AsRef<Path>, base: u32, max_size: u64) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let found = std::fs::metadata(path)?.len();
        if found > max_size {
            return Err(ScanError::ImageTooLarge {
                limit: max_size,
                found,
            });
        }

        let data = std::fs::read(path)?;

        #[cfg(feature = "logging")]
        debug!("Loaded {} bytes from {}", data.len(), path.display());

        Self::new(data, base)
    }

    /// Base address of the first byte
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; empty images are rejected on construction
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw bytes
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Resolve an absolute address to an offset, if it lies within the image
    pub fn resolve(&self, address: u32) -> Option<usize> {
        let offset = address.checked_sub(self.base)? as usize;
        (offset < self.data.len()).then_some(offset)
    }

    /// Absolute address of an offset
    pub fn address_of(&self, offset: usize) -> u32 {
        self.base.wrapping_add(offset as u32)
    }

    /// Borrow `len` bytes at `offset`
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8], DecodeError> {
        offset
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .map(|end| &self.data[offset..end])
            .ok_or(DecodeError::OutOfBounds { offset, len })
    }

    /// Zero-copy sub-buffer of `len` bytes at `offset`
    pub fn slice_bytes(&self, offset: usize, len: usize) -> Result<Bytes, DecodeError> {
        self.slice(offset, len)?;
        Ok(self.data.slice(offset..offset + len))
    }

    /// Read a byte
    pub fn read_u8(&self, offset: usize) -> Result<u8, DecodeError> {
        Ok(self.slice(offset, 1)?[0])
    }

    /// Read a little-endian u16
    pub fn read_u16(&self, offset: usize) -> Result<u16, DecodeError> {
        let b = self.slice(offset, 2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a little-endian u32
    pub fn read_u32(&self, offset: usize) -> Result<u32, DecodeError> {
        let b = self.slice(offset, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a pointer cell and resolve it to an offset
    pub fn read_pointer(&self, offset: usize) -> Result<usize, DecodeError> {
        let address = self.read_u32(offset)?;
        self.resolve(address)
            .ok_or(DecodeError::InvalidPointer(address))
    }

    /// Read a NUL-terminated byte string of at most `max_len` bytes (terminator included)
    pub fn read_cstring(&self, offset: usize, max_len: usize) -> Result<&[u8], DecodeError> {
        let available = self.data.len().saturating_sub(offset).min(max_len);
        let window = self.slice(offset, available)?;
        let end = memchr::memchr(0, window).ok_or(DecodeError::BadString(offset))?;
        Ok(&window[..end])
    }

    /// Iterate over every pointer-aligned cell offset whose full 4 bytes lie in `start..end`
    pub fn cell_offsets(&self, start: usize, end: usize) -> impl Iterator<Item = usize> {
        let end = end.min(self.data.len());
        let first = start.next_multiple_of(POINTER_SIZE);
        let last = end.saturating_sub(POINTER_SIZE - 1);
        (first..last).step_by(POINTER_SIZE)
    }
}
