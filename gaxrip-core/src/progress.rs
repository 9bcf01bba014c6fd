//! One-way progress reporting

/// Stage of a scan a checkpoint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Building the pointer index
    Index,
    /// Looking for the version marker
    Probe,
    /// Trial-decoding pointer targets
    Scan,
    /// Walking back-reference chains
    Orphans,
}

/// A coarse-grained checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Stage being reported
    pub phase: Phase,
    /// Units completed (bytes for `Index`, targets otherwise)
    pub position: usize,
    /// Units in the stage
    pub total: usize,
}

impl Progress {
    /// Whether this checkpoint closes its stage
    pub fn is_complete(&self) -> bool {
        self.position >= self.total
    }
}

/// Receiver of progress checkpoints
///
/// Reports carry no control flow; the cadence is a hint only.
pub trait ProgressSink {
    /// Receive one checkpoint
    fn report(&mut self, progress: Progress);
}

impl<F: FnMut(Progress)> ProgressSink for F {
    fn report(&mut self, progress: Progress) {
        self(progress)
    }
}

/// Sink that drops every checkpoint
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _progress: Progress) {}
}
