//! Recovery of records reachable only through back-reference chains
//!
//! Some songs are never pointed at from inside the scanned window. They can
//! still be reached backwards from a structure an accepted song shares with
//! them: starting at that structure's address, each hop looks up the cells
//! pointing at the current address in the [`PointerIndex`] and steps back a
//! fixed distance from each cell to the header of the structure holding it.
//!
//! The hop distances are reverse-engineered per engine revision and kept as
//! data in [`ChainProfile`]s.

use crate::attempt::attempt;
use crate::constants::{
    INSTRUMENT_SET_FIELD, LEGACY_2_02B_HEADER_CORRECTION, LEGACY_HANDLER_INSTRUMENT_FIELD,
    LEGACY_SEQUENCE_HANDLER_FIELD, SEQUENCE_FIELD, TARGET_PROGRESS_INTERVAL,
};
use crate::decoder::{decode_accepted, Decoder};
use crate::image::Image;
use crate::index::PointerIndex;
use crate::progress::{Phase, Progress, ProgressSink};
use crate::scanner::ScanStats;
use crate::types::{RecordSet, SubPointer, VersionInfo};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Versions a chain profile applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMatch {
    /// Lowest major version matched
    pub min_major: u8,
    /// Highest major version matched
    pub max_major: u8,
    /// Exact minor version, if restricted
    #[serde(default)]
    pub minor: Option<u8>,
    /// Exact build tag, if restricted
    #[serde(default)]
    pub build: Option<String>,
}

impl VersionMatch {
    /// Match a range of major versions
    pub fn majors(min_major: u8, max_major: u8) -> Self {
        Self {
            min_major,
            max_major,
            minor: None,
            build: None,
        }
    }

    /// Whether `version` falls under this match
    pub fn matches(&self, version: &VersionInfo) -> bool {
        (self.min_major..=self.max_major).contains(&version.major)
            && self.minor.map_or(true, |m| m == version.minor)
            && self
                .build
                .as_deref()
                .map_or(true, |b| b.eq_ignore_ascii_case(&version.build))
    }
}

/// A backward pointer chain for one family of engine revisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainProfile {
    /// Label used in logs and config files
    pub name: String,

    /// Versions this profile applies to
    pub versions: VersionMatch,

    /// Sub-pointer field the walk starts from
    #[serde(default = "default_anchor")]
    pub anchor: SubPointer,

    /// Distance from each hop's pointer cell back to its structure header
    pub hops: Vec<i32>,

    /// Extra distance added to the first hop only
    #[serde(default)]
    pub first_hop_correction: i32,
}

fn default_anchor() -> SubPointer {
    SubPointer::InstrumentSet
}

impl ChainProfile {
    /// Distance used at hop `hop`, correction included
    pub fn hop_distance(&self, hop: usize) -> i64 {
        let base = i64::from(self.hops.get(hop).copied().unwrap_or_default());
        if hop == 0 {
            base + i64::from(self.first_hop_correction)
        } else {
            base
        }
    }

    /// Number of hops
    pub fn depth(&self) -> usize {
        self.hops.len()
    }
}

/// Built-in chain profiles, most specific first
///
/// - 3.x: the song header's own instrument-set field (one hop).
/// - 1.x/2.x: instrument set ← sound handler ← sequence block ← song header.
/// - 2.02B: as 1.x/2.x, with a sound handler header grown by 4 bytes.
pub fn default_profiles() -> Vec<ChainProfile> {
    let legacy_hops = vec![
        LEGACY_HANDLER_INSTRUMENT_FIELD,
        LEGACY_SEQUENCE_HANDLER_FIELD,
        SEQUENCE_FIELD as i32,
    ];
    vec![
        ChainProfile {
            name: "legacy-2.02B".to_string(),
            versions: VersionMatch {
                min_major: 2,
                max_major: 2,
                minor: Some(2),
                build: Some("B".to_string()),
            },
            anchor: SubPointer::InstrumentSet,
            hops: legacy_hops.clone(),
            first_hop_correction: LEGACY_2_02B_HEADER_CORRECTION,
        },
        ChainProfile {
            name: "legacy".to_string(),
            versions: VersionMatch::majors(1, 2),
            anchor: SubPointer::InstrumentSet,
            hops: legacy_hops,
            first_hop_correction: 0,
        },
        ChainProfile {
            name: "current".to_string(),
            versions: VersionMatch::majors(3, 3),
            anchor: SubPointer::InstrumentSet,
            hops: vec![INSTRUMENT_SET_FIELD as i32],
            first_hop_correction: 0,
        },
    ]
}

/// First profile matching `version`
pub fn select_profile<'a>(
    profiles: &'a [ChainProfile],
    version: &VersionInfo,
) -> Option<&'a ChainProfile> {
    profiles.iter().find(|p| p.versions.matches(version))
}

/// Walk `profile`'s chain backwards from `start`, returning end-point addresses
///
/// Intermediate structure headers must themselves be pointer targets;
/// end-points are returned unfiltered, in discovery order, without repeats.
pub fn walk_chain(
    image: &Image,
    index: &PointerIndex,
    profile: &ChainProfile,
    start: u32,
) -> Vec<u32> {
    let depth = profile.depth();
    if depth == 0 {
        return Vec::new();
    }

    let mut frontier = vec![start];
    for hop in 0..depth {
        let distance = profile.hop_distance(hop);
        let is_last = hop + 1 == depth;
        let mut seen = HashSet::new();
        let mut next = Vec::new();

        for &address in &frontier {
            for &source in index.sources(address) {
                let header = i64::from(image.address_of(source)) - distance;
                let Ok(header) = u32::try_from(header) else {
                    continue;
                };
                if image.resolve(header).is_none() {
                    continue;
                }
                if !is_last && !index.is_target(header) {
                    continue;
                }
                if seen.insert(header) {
                    next.push(header);
                }
            }
        }

        #[cfg(feature = "logging")]
        trace!(
            "Chain {} from {:#010x}: hop {} -> {} candidates",
            profile.name,
            start,
            hop + 1,
            next.len()
        );

        frontier = next;
        if frontier.is_empty() {
            break;
        }
    }

    frontier
}

/// Recover records reachable backwards from the anchors of accepted records
///
/// Each distinct anchor value is walked once. End-points that are already
/// records or are pointer targets (the direct scan's territory) are skipped;
/// the rest are trial-decoded and accepted under the same predicate as the
/// direct scan. Returns the offsets of recovered records.
#[allow(clippy::too_many_arguments)]
pub fn find_orphans<D: Decoder + ?Sized>(
    image: &Image,
    index: &PointerIndex,
    decoder: &D,
    version: &VersionInfo,
    profile: &ChainProfile,
    records: &mut RecordSet<D::Payload>,
    stats: &mut ScanStats,
    progress: &mut dyn ProgressSink,
) -> Vec<usize> {
    let mut anchors = Vec::new();
    let mut seen = HashSet::new();
    for record in records.iter() {
        if let Some(anchor) = record.sub_pointer(profile.anchor) {
            if seen.insert(anchor) {
                anchors.push(anchor);
            }
        }
    }

    #[cfg(feature = "logging")]
    debug!(
        "Walking {} chain from {} distinct anchors",
        profile.name,
        anchors.len()
    );

    let total = anchors.len();
    let mut recovered = Vec::new();

    for (walked, &anchor) in anchors.iter().enumerate() {
        if walked % TARGET_PROGRESS_INTERVAL == 0 {
            progress.report(Progress {
                phase: Phase::Orphans,
                position: walked,
                total,
            });
        }
        stats.orphan_chains += 1;

        for candidate in walk_chain(image, index, profile, anchor) {
            let Some(offset) = image.resolve(candidate) else {
                continue;
            };
            if records.contains(offset) || index.is_target(candidate) {
                continue;
            }

            stats.orphan_candidates += 1;
            let trial = attempt(offset, |ctx| decode_accepted(decoder, image, offset, version, ctx));

            match trial.commit(records) {
                Ok(()) => {
                    #[cfg(feature = "logging")]
                    debug!(
                        "Recovered orphan at {:#010x} via anchor {:#010x}",
                        candidate, anchor
                    );
                    stats.orphans_recovered += 1;
                    recovered.push(offset);
                }
                Err(reason) => stats.count_rejection(&reason),
            }
        }
    }

    progress.report(Progress {
        phase: Phase::Orphans,
        position: total,
        total,
    });

    recovered
}
