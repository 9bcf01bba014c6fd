//! Per-trial decode isolation
//!
//! Every trial decode gets a fresh [`AttemptContext`] that lives exactly as
//! long as the trial. Caches and pointer bookkeeping built while decoding
//! garbage can therefore never leak into the next trial.

use crate::error::DecodeError;
use crate::types::{Record, RecordSet};
use hashbrown::HashMap;
use std::any::{Any, TypeId};
use std::fmt;

#[cfg(feature = "logging")]
use tracing::trace;

/// A pointer read during a trial: the cell it was read from and where it led
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    /// Offset of the pointer cell
    pub field: usize,
    /// Offset the pointer resolved to
    pub target: usize,
}

/// Transient state owned by a single decode trial
pub struct AttemptContext {
    offset: usize,
    cache: HashMap<(TypeId, usize), Box<dyn Any>>,
    relocations: Vec<Relocation>,
}

impl AttemptContext {
    fn new(offset: usize) -> Self {
        Self {
            offset,
            cache: HashMap::new(),
            relocations: Vec::new(),
        }
    }

    /// Offset the trial started at
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Decode an object at `offset` once per trial, serving repeats from the cache
    pub fn cached<T, F>(&mut self, offset: usize, decode: F) -> Result<T, DecodeError>
    where
        T: Any + Clone,
        F: FnOnce(&mut Self) -> Result<T, DecodeError>,
    {
        let key = (TypeId::of::<T>(), offset);
        if let Some(hit) = self.cache.get(&key).and_then(|v| v.downcast_ref::<T>()) {
            return Ok(hit.clone());
        }
        let value = decode(self)?;
        self.cache.insert(key, Box::new(value.clone()));
        Ok(value)
    }

    /// Number of cached objects
    pub fn cached_objects(&self) -> usize {
        self.cache.len()
    }

    /// Note a pointer followed during this trial
    pub fn record_pointer(&mut self, field: usize, target: usize) {
        self.relocations.push(Relocation { field, target });
    }

    /// Pointers followed so far, in read order
    pub fn relocations(&self) -> &[Relocation] {
        &self.relocations
    }
}

impl fmt::Debug for AttemptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptContext")
            .field("offset", &self.offset)
            .field("cached_objects", &self.cache.len())
            .field("relocations", &self.relocations.len())
            .finish()
    }
}

/// Why a trial produced nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The decoder could not interpret the bytes
    Decode(DecodeError),
    /// The decoded name is too short to be real
    NameTooShort(usize),
    /// The decoded name lacks the title/artist delimiter
    MissingDelimiter,
    /// A record already exists at this offset
    AlreadyKnown(usize),
}

impl From<DecodeError> for Rejection {
    fn from(err: DecodeError) -> Self {
        Rejection::Decode(err)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Decode(e) => write!(f, "decode failed: {}", e),
            Rejection::NameTooShort(len) => write!(f, "name too short ({} chars)", len),
            Rejection::MissingDelimiter => write!(f, "name lacks delimiter"),
            Rejection::AlreadyKnown(offset) => write!(f, "record already known at {:#x}", offset),
        }
    }
}

/// Outcome of one trial
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt<T> {
    /// The trial produced a plausible value
    Accepted(T),
    /// The trial was discarded
    Rejected(Rejection),
}

impl<T> Attempt<T> {
    /// Whether the trial was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, Attempt::Accepted(_))
    }

    /// The accepted value, if any
    pub fn accepted(self) -> Option<T> {
        match self {
            Attempt::Accepted(value) => Some(value),
            Attempt::Rejected(_) => None,
        }
    }
}

impl<P> Attempt<Record<P>> {
    /// Commit an accepted record into `set`
    ///
    /// Insertion either fully succeeds or leaves the set untouched.
    pub fn commit(self, set: &mut RecordSet<P>) -> Result<(), Rejection> {
        match self {
            Attempt::Accepted(record) => set
                .insert(record)
                .map_err(|dup| Rejection::AlreadyKnown(dup.offset)),
            Attempt::Rejected(reason) => Err(reason),
        }
    }
}

/// Run one isolated trial at `offset`
///
/// The context is created before `trial` runs and dropped before this
/// function returns, whatever the outcome.
pub fn attempt<T, F>(offset: usize, trial: F) -> Attempt<T>
where
    F: FnOnce(&mut AttemptContext) -> Result<T, Rejection>,
{
    let mut ctx = AttemptContext::new(offset);
    let result = trial(&mut ctx);

    #[cfg(feature = "logging")]
    if let Err(reason) = &result {
        trace!("Trial at {:#x} discarded: {} ({:?})", offset, reason, ctx);
    }

    drop(ctx);

    match result {
        Ok(value) => Attempt::Accepted(value),
        Err(reason) => Attempt::Rejected(reason),
    }
}
