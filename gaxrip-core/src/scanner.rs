//! Brute-force record scanner over pointer targets

use crate::attempt::{attempt, Attempt, Rejection};
use crate::constants::TARGET_PROGRESS_INTERVAL;
use crate::decoder::{decode_accepted, Decoder};
use crate::image::Image;
use crate::index::PointerIndex;
use crate::progress::{Phase, Progress, ProgressSink};
use crate::types::{RecordSet, VersionInfo};
use serde::Serialize;

#[cfg(feature = "logging")]
use tracing::debug;

/// Scan statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Bytes in the image
    pub bytes_scanned: usize,

    /// Distinct pointer targets in the index
    pub targets: usize,

    /// Trial decodes performed by the structure scanner
    pub attempts: usize,

    /// Records accepted by the structure scanner
    pub accepted: usize,

    /// Trials the decoder rejected
    pub decode_failures: usize,

    /// Trials the acceptance predicate rejected
    pub predicate_rejections: usize,

    /// Distinct sub-pointer values chains were walked from
    pub orphan_chains: usize,

    /// Chain end-points trial-decoded by the orphan finder
    pub orphan_candidates: usize,

    /// Records recovered by the orphan finder
    pub orphans_recovered: usize,
}

impl ScanStats {
    /// Records found by both passes
    pub fn total_records(&self) -> usize {
        self.accepted + self.orphans_recovered
    }

    /// Share of direct-scan trials that produced a record, as a percentage
    pub fn hit_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            (self.accepted as f64 / self.attempts as f64) * 100.0
        }
    }

    pub(crate) fn count_rejection(&mut self, reason: &Rejection) {
        match reason {
            Rejection::Decode(_) => self.decode_failures += 1,
            Rejection::NameTooShort(_) | Rejection::MissingDelimiter => {
                self.predicate_rejections += 1
            }
            Rejection::AlreadyKnown(_) => {}
        }
    }
}

/// Trial-decode every distinct pointer target as a record of `version`
///
/// Each target gets its own trial. Decode failures and predicate rejections
/// are discarded and the scan moves on; nothing short of the end of the
/// target list stops it.
pub fn scan_records<D: Decoder + ?Sized>(
    image: &Image,
    index: &PointerIndex,
    decoder: &D,
    version: &VersionInfo,
    progress: &mut dyn ProgressSink,
) -> (RecordSet<D::Payload>, ScanStats) {
    let mut records = RecordSet::new();
    let mut stats = ScanStats {
        bytes_scanned: image.len(),
        targets: index.len(),
        ..Default::default()
    };

    let targets = index.targets();
    let total = targets.len();

    #[cfg(feature = "logging")]
    debug!(
        "Scanning {} pointer targets for version {} records",
        total, version
    );

    for (visited, &target) in targets.iter().enumerate() {
        if visited % TARGET_PROGRESS_INTERVAL == 0 {
            progress.report(Progress {
                phase: Phase::Scan,
                position: visited,
                total,
            });
        }

        let Some(offset) = image.resolve(target) else {
            continue;
        };

        stats.attempts += 1;
        let trial = attempt(offset, |ctx| decode_accepted(decoder, image, offset, version, ctx));

        match trial {
            Attempt::Accepted(record) => {
                #[cfg(feature = "logging")]
                debug!("Accepted record at {:#010x}: {}", record.address, record.name);

                if let Err(dup) = records.insert(record) {
                    // Targets are distinct, so this only guards the invariant
                    stats.count_rejection(&Rejection::AlreadyKnown(dup.offset));
                    continue;
                }
                stats.accepted += 1;
            }
            Attempt::Rejected(reason) => stats.count_rejection(&reason),
        }
    }

    progress.report(Progress {
        phase: Phase::Scan,
        position: total,
        total,
    });

    #[cfg(feature = "logging")]
    debug!(
        "Scan complete: {} records from {} trials ({} decode failures, {} predicate rejections)",
        stats.accepted, stats.attempts, stats.decode_failures, stats.predicate_rejections
    );

    (records, stats)
}
