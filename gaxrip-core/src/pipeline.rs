//! End-to-end scanning session
//!
//! Runs index build, version probe, direct scan, orphan recovery and name
//! disambiguation in order over one image.

use crate::config::ScanConfig;
use crate::decoder::Decoder;
use crate::dedup::dedup_names;
use crate::error::ScanError;
use crate::image::Image;
use crate::index::PointerIndex;
use crate::orphan::find_orphans;
use crate::progress::ProgressSink;
use crate::prober::probe_version;
use crate::scanner::{scan_records, ScanStats};
use crate::types::{Record, VersionInfo};

#[cfg(feature = "logging")]
use tracing::{debug, info};

/// Outcome of a scanning session
#[derive(Debug, Clone)]
pub struct ScanReport<P> {
    /// Version every record was decoded with
    pub version: VersionInfo,

    /// Whether `version` came from a marker in the image
    pub version_detected: bool,

    /// Offset of the version marker, when one was found
    pub version_offset: Option<usize>,

    /// Accepted records: direct-scan hits first, then recovered orphans
    pub records: Vec<Record<P>>,

    /// Counters gathered along the way
    pub stats: ScanStats,
}

/// A decoder paired with the settings it scans under
pub struct Pipeline<'a, D: Decoder + ?Sized> {
    decoder: &'a D,
    config: &'a ScanConfig,
}

impl<'a, D: Decoder + ?Sized> Pipeline<'a, D> {
    /// Create a pipeline
    pub fn new(decoder: &'a D, config: &'a ScanConfig) -> Self {
        Self { decoder, config }
    }

    /// Scan `image`
    ///
    /// Only configuration problems fail; every per-target rejection is
    /// absorbed into the returned statistics.
    pub fn run(
        &self,
        image: &Image,
        progress: &mut dyn ProgressSink,
    ) -> Result<ScanReport<D::Payload>, ScanError> {
        self.config.validate()?;
        let window = self.config.window_range(image.len())?;

        let index = PointerIndex::build_window(image, window, progress);

        #[cfg(feature = "logging")]
        debug!(
            "Pointer index: {} targets from {} entries",
            index.len(),
            index.entries()
        );

        let probed = probe_version(image, &index, self.decoder, progress);
        let version_detected = probed.is_some();
        let version_offset = probed.as_ref().map(|p| p.offset);
        let version = match probed {
            Some(found) => {
                #[cfg(feature = "logging")]
                info!("GAX version {} found: {}", found.version, found.version.raw);
                found.version
            }
            None => {
                let fallback = self.config.default_version.clone();
                #[cfg(feature = "logging")]
                info!(
                    "GAX version string not found. Assuming GAX version {}",
                    fallback.major
                );
                fallback
            }
        };

        let (mut records, mut stats) =
            scan_records(image, &index, self.decoder, &version, progress);

        if let Some(profile) = self.config.profile_for(&version) {
            find_orphans(
                image,
                &index,
                self.decoder,
                &version,
                profile,
                &mut records,
                &mut stats,
                progress,
            );
        }

        let renamed = dedup_names(&mut records);

        #[cfg(feature = "logging")]
        {
            if renamed > 0 {
                debug!("Renamed {} records with shared names", renamed);
            }
            for record in records.iter() {
                info!("{:#010X}: {}", record.address, self.decoder.describe(record));
            }
        }
        #[cfg(not(feature = "logging"))]
        let _ = renamed;

        Ok(ScanReport {
            version,
            version_detected,
            version_offset,
            records: records.into_records(),
            stats,
        })
    }
}

/// Scan `image` with `decoder` under `config`
pub fn run<D: Decoder + ?Sized>(
    image: &Image,
    decoder: &D,
    config: &ScanConfig,
    progress: &mut dyn ProgressSink,
) -> Result<ScanReport<D::Payload>, ScanError> {
    Pipeline::new(decoder, config).run(image, progress)
}
