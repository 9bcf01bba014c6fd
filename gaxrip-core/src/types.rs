//! Core types for recovered records

use crate::constants::DEFAULT_MAJOR_VERSION;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Engine version established once per scanning session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Major version (selects the record layout)
    pub major: u8,

    /// Minor version
    pub minor: u8,

    /// Build tag following the minor number (e.g. "A", "Plus"); may be empty
    #[serde(default)]
    pub build: String,

    /// The marker string as found in the image
    #[serde(default)]
    pub raw: String,
}

impl VersionInfo {
    /// A version with no marker text, used as the configured fallback
    pub fn assumed(major: u8) -> Self {
        Self {
            major,
            minor: 0,
            build: String::new(),
            raw: String::new(),
        }
    }

    /// True for the pre-3.0 record layout
    pub fn is_legacy(&self) -> bool {
        self.major < 3
    }
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self::assumed(DEFAULT_MAJOR_VERSION)
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}{}", self.major, self.minor, self.build)
    }
}

/// Named pointer fields a record exposes to the orphan finder
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubPointer {
    /// Pattern/sequence data
    SequenceData,
    /// Instrument set shared between songs of one game
    InstrumentSet,
    /// Sample set
    SampleSet,
}

/// A record accepted by the scanner
#[derive(Debug, Clone, PartialEq)]
pub struct Record<P> {
    /// Byte offset of the record header within the image (unique key)
    pub offset: usize,

    /// Absolute address of the record header
    pub address: u32,

    /// Version the record was decoded with
    pub version: VersionInfo,

    /// Display name; rewritten by dedup when not unique
    pub name: String,

    /// Absolute addresses of named pointer fields
    pub sub_pointers: BTreeMap<SubPointer, u32>,

    /// Decoder-specific payload
    pub payload: P,
}

impl<P> Record<P> {
    /// Value of a named pointer field
    pub fn sub_pointer(&self, kind: SubPointer) -> Option<u32> {
        self.sub_pointers.get(&kind).copied()
    }
}

/// Accepted records keyed by offset, kept in insertion order
#[derive(Debug, Clone)]
pub struct RecordSet<P> {
    records: Vec<Record<P>>,
    by_offset: HashMap<usize, usize>,
}

impl<P> RecordSet<P> {
    /// Create an empty set
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            by_offset: HashMap::new(),
        }
    }

    /// Insert a record unless its offset is already present
    ///
    /// Returns the record back when the offset is taken.
    pub fn insert(&mut self, record: Record<P>) -> Result<(), Record<P>> {
        if self.by_offset.contains_key(&record.offset) {
            return Err(record);
        }
        self.by_offset.insert(record.offset, self.records.len());
        self.records.push(record);
        Ok(())
    }

    /// Whether a record exists at `offset`
    pub fn contains(&self, offset: usize) -> bool {
        self.by_offset.contains_key(&offset)
    }

    /// Record at `offset`
    pub fn get(&self, offset: usize) -> Option<&Record<P>> {
        self.by_offset.get(&offset).map(|&i| &self.records[i])
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, Record<P>> {
        self.records.iter()
    }

    /// Mutable access for display-name rewrites; offsets must not change
    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Record<P>> {
        self.records.iter_mut()
    }

    /// Consume the set, yielding records in insertion order
    pub fn into_records(self) -> Vec<Record<P>> {
        self.records
    }
}

impl<P> Default for RecordSet<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, P> IntoIterator for &'a RecordSet<P> {
    type Item = &'a Record<P>;
    type IntoIter = std::slice::Iter<'a, Record<P>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
