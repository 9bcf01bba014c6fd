//! Reverse pointer index

use crate::constants::INDEX_PROGRESS_INTERVAL;
use crate::image::Image;
use crate::progress::{Phase, Progress, ProgressSink};
use hashbrown::HashMap;
use std::ops::Range;

#[cfg(feature = "logging")]
use tracing::debug;

/// Map from pointer target address to the offsets of cells that point at it
///
/// Built in one linear pass over every aligned cell and never mutated
/// afterwards. Most entries are coincidental; acceptance predicates sort
/// real structures from noise later.
#[derive(Debug, Clone, Default)]
pub struct PointerIndex {
    /// Distinct targets in first-discovery order
    targets: Vec<u32>,

    /// Source offsets per target, in discovery order
    sources: HashMap<u32, Vec<usize>>,

    /// Number of cells examined
    cells: usize,

    /// Number of cells that resolved into the image
    entries: usize,
}

impl PointerIndex {
    /// Index every aligned cell of the image
    pub fn build(image: &Image, progress: &mut dyn ProgressSink) -> Self {
        Self::build_window(image, 0..image.len(), progress)
    }

    /// Index the aligned cells lying fully inside `window`
    ///
    /// Targets may lie anywhere in the image; only the source cells are
    /// restricted.
    pub fn build_window(image: &Image, window: Range<usize>, progress: &mut dyn ProgressSink) -> Self {
        let mut index = Self::default();
        let total = window.end.saturating_sub(window.start);

        #[cfg(feature = "logging")]
        debug!(
            "Building pointer index over {:#x}..{:#x}",
            window.start, window.end
        );

        let bytes = image.bytes();
        let mut next_checkpoint = window.start + INDEX_PROGRESS_INTERVAL;

        for offset in image.cell_offsets(window.start, window.end) {
            let value = u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ]);
            index.cells += 1;

            if image.resolve(value).is_some() {
                index.insert(value, offset);
            }

            if offset >= next_checkpoint {
                progress.report(Progress {
                    phase: Phase::Index,
                    position: offset - window.start,
                    total,
                });
                next_checkpoint += INDEX_PROGRESS_INTERVAL;
            }
        }

        progress.report(Progress {
            phase: Phase::Index,
            position: total,
            total,
        });

        #[cfg(feature = "logging")]
        debug!(
            "Pointer index complete: {} cells, {} entries, {} distinct targets",
            index.cells,
            index.entries,
            index.targets.len()
        );

        index
    }

    fn insert(&mut self, target: u32, source: usize) {
        self.entries += 1;
        let targets = &mut self.targets;
        self.sources
            .entry(target)
            .or_insert_with(|| {
                targets.push(target);
                Vec::with_capacity(1)
            })
            .push(source);
    }

    /// Distinct target addresses in first-discovery order
    pub fn targets(&self) -> &[u32] {
        &self.targets
    }

    /// Offsets of the cells pointing at `target`, in discovery order
    pub fn sources(&self, target: u32) -> &[usize] {
        self.sources.get(&target).map_or(&[], Vec::as_slice)
    }

    /// Whether any indexed cell points at `address`
    pub fn is_target(&self, address: u32) -> bool {
        self.sources.contains_key(&address)
    }

    /// Number of distinct targets
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether no cell resolved into the image
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Number of (target, source) pairs
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Number of cells examined
    pub fn cells_scanned(&self) -> usize {
        self.cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ROM_BASE_ADDRESS;
    use crate::progress::NoProgress;

    fn image_with_cells(cells: &[u32]) -> Image {
        let data: Vec<u8> = cells.iter().flat_map(|c| c.to_le_bytes()).collect();
        Image::from_rom(data).unwrap()
    }

    #[test]
    fn test_index_records_in_bounds_pointers() {
        let base = ROM_BASE_ADDRESS;
        let image = image_with_cells(&[base + 8, 0xDEAD_BEEF, base + 8, base + 15]);
        let index = PointerIndex::build(&image, &mut NoProgress);

        assert_eq!(index.targets(), &[base + 8, base + 15]);
        assert_eq!(index.sources(base + 8), &[0, 8]);
        assert_eq!(index.sources(base + 15), &[12]);
        assert_eq!(index.entries(), 3);
        assert_eq!(index.cells_scanned(), 4);
        assert!(!index.is_target(0xDEAD_BEEF));
    }

    #[test]
    fn test_index_excludes_one_past_end() {
        let base = ROM_BASE_ADDRESS;
        let image = image_with_cells(&[base + 16, base + 15, base, base - 1]);
        let index = PointerIndex::build(&image, &mut NoProgress);

        assert!(!index.is_target(base + 16));
        assert!(index.is_target(base + 15));
        assert!(index.is_target(base));
        assert!(!index.is_target(base - 1));
    }

    #[test]
    fn test_index_ignores_trailing_partial_cell() {
        let base = ROM_BASE_ADDRESS;
        let mut data = (base + 4).to_le_bytes().to_vec();
        data.extend_from_slice(&[0x00, 0x00, 0x00]);
        let image = Image::from_rom(data).unwrap();
        let index = PointerIndex::build(&image, &mut NoProgress);

        assert_eq!(index.cells_scanned(), 1);
        assert_eq!(index.sources(base + 4), &[0]);
    }

    #[test]
    fn test_window_limits_sources_not_targets() {
        let base = ROM_BASE_ADDRESS;
        let image = image_with_cells(&[base + 12, base + 12, base, base + 4]);
        let index = PointerIndex::build_window(&image, 4..12, &mut NoProgress);

        assert_eq!(index.sources(base + 12), &[4]);
        assert_eq!(index.sources(base), &[8]);
        assert!(!index.is_target(base + 4));
    }

    #[test]
    fn test_progress_reports_completion() {
        let image = Image::from_rom(vec![0u8; 3 * INDEX_PROGRESS_INTERVAL]).unwrap();
        let mut reports = Vec::new();
        let mut sink = |p: Progress| reports.push(p);
        PointerIndex::build(&image, &mut sink);

        assert!(reports.len() >= 3);
        assert!(reports.iter().all(|p| p.phase == Phase::Index));
        assert!(reports.last().unwrap().is_complete());
    }
}
