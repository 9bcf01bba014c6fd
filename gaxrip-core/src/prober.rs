//! Version marker discovery

use crate::attempt::{attempt, Attempt, Rejection};
use crate::constants::TARGET_PROGRESS_INTERVAL;
use crate::decoder::Decoder;
use crate::error::DecodeError;
use crate::image::Image;
use crate::index::PointerIndex;
use crate::progress::{Phase, Progress, ProgressSink};
use crate::types::VersionInfo;

#[cfg(feature = "logging")]
use tracing::debug;

/// A version marker and where it was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedVersion {
    /// Offset of the marker
    pub offset: usize,
    /// Parsed marker
    pub version: VersionInfo,
}

/// Find the first pointer target holding a version marker
///
/// Targets are visited in first-discovery order, each in its own trial.
/// Returns `None` when no target holds a marker; callers then fall back to
/// their configured default version.
pub fn probe_version<D: Decoder + ?Sized>(
    image: &Image,
    index: &PointerIndex,
    decoder: &D,
    progress: &mut dyn ProgressSink,
) -> Option<ProbedVersion> {
    let targets = index.targets();
    let total = targets.len();

    for (visited, &target) in targets.iter().enumerate() {
        if visited % TARGET_PROGRESS_INTERVAL == 0 {
            progress.report(Progress {
                phase: Phase::Probe,
                position: visited,
                total,
            });
        }

        let Some(offset) = image.resolve(target) else {
            continue;
        };

        let trial = attempt(offset, |ctx| {
            decoder
                .probe_version(image, offset, ctx)
                .ok_or(Rejection::Decode(DecodeError::NoVersionMarker))
        });

        if let Attempt::Accepted(version) = trial {
            #[cfg(feature = "logging")]
            debug!(
                "Version marker at {:#010x}: {}",
                target, version.raw
            );

            progress.report(Progress {
                phase: Phase::Probe,
                position: total,
                total,
            });
            return Some(ProbedVersion { offset, version });
        }
    }

    progress.report(Progress {
        phase: Phase::Probe,
        position: total,
        total,
    });
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ImageBuilder;
    use crate::gax::GaxDecoder;
    use crate::progress::NoProgress;

    #[test]
    fn test_probe_finds_referenced_marker() {
        let mut rom = ImageBuilder::new(0x100);
        rom.put_version_marker(0x40, "GAX Sound Engine v2.02B (Mar 1 2002)");
        rom.put_pointer(0x10, 0x40);
        let image = rom.build().unwrap();
        let index = PointerIndex::build(&image, &mut NoProgress);

        let found = probe_version(&image, &index, &GaxDecoder, &mut NoProgress).unwrap();
        assert_eq!(found.offset, 0x40);
        assert_eq!(found.version.major, 2);
        assert_eq!(found.version.minor, 2);
        assert_eq!(found.version.build, "B");
    }

    #[test]
    fn test_probe_ignores_unreferenced_marker() {
        let mut rom = ImageBuilder::new(0x100);
        rom.put_version_marker(0x40, "GAX Sound Engine v3.05A");
        let image = rom.build().unwrap();
        let index = PointerIndex::build(&image, &mut NoProgress);

        assert!(probe_version(&image, &index, &GaxDecoder, &mut NoProgress).is_none());
    }

    #[test]
    fn test_probe_takes_first_discovered() {
        let mut rom = ImageBuilder::new(0x100);
        rom.put_version_marker(0x40, "GAX Sound Engine v3.05A");
        rom.put_version_marker(0x80, "GAX Sound Engine v2.10");
        // The 2.10 marker is referenced first
        rom.put_pointer(0x00, 0x80);
        rom.put_pointer(0x04, 0x40);
        let image = rom.build().unwrap();
        let index = PointerIndex::build(&image, &mut NoProgress);

        let found = probe_version(&image, &index, &GaxDecoder, &mut NoProgress).unwrap();
        assert_eq!(found.version.major, 2);
        assert_eq!(found.version.minor, 10);
    }

    #[test]
    fn test_probe_reports_completion_when_missing() {
        let image = ImageBuilder::new(0x40).build().unwrap();
        let index = PointerIndex::build(&image, &mut NoProgress);
        let mut last = None;
        let mut sink = |p: Progress| last = Some(p);

        assert!(probe_version(&image, &index, &GaxDecoder, &mut sink).is_none());
        assert_eq!(
            last,
            Some(Progress {
                phase: Phase::Probe,
                position: 0,
                total: 0
            })
        );
    }
}
