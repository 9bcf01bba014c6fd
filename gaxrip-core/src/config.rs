//! Scan configuration

use crate::constants::{MAX_IMAGE_SIZE, ROM_BASE_ADDRESS};
use crate::error::ScanError;
use crate::orphan::{default_profiles, select_profile, ChainProfile};
use crate::types::VersionInfo;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Byte range of the image whose cells feed the pointer index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWindow {
    /// First offset scanned
    pub start: usize,
    /// One past the last offset scanned
    pub end: usize,
}

/// Settings for one scanning session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Address the first image byte is mapped at
    pub base_address: u32,

    /// Restrict pointer sources to a sub-range; `None` scans the whole image
    pub window: Option<ScanWindow>,

    /// Version assumed when the image holds no version marker
    pub default_version: VersionInfo,

    /// Largest image accepted, in bytes
    pub max_image_size: u64,

    /// Back-reference chains, most specific first
    pub orphan_profiles: Vec<ChainProfile>,

    /// Run the orphan finder after the direct scan
    pub find_orphans: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            base_address: ROM_BASE_ADDRESS,
            window: None,
            default_version: VersionInfo::default(),
            max_image_size: MAX_IMAGE_SIZE,
            orphan_profiles: default_profiles(),
            find_orphans: true,
        }
    }
}

impl ScanConfig {
    /// Check settings that do not depend on an image
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.max_image_size == 0 {
            return Err(ScanError::Config("max_image_size must be non-zero".into()));
        }
        if !(1..=3).contains(&self.default_version.major) {
            return Err(ScanError::Config(format!(
                "unsupported default version {}",
                self.default_version.major
            )));
        }
        for profile in &self.orphan_profiles {
            if profile.hops.is_empty() {
                return Err(ScanError::Config(format!(
                    "chain profile {} has no hops",
                    profile.name
                )));
            }
            if profile.versions.min_major > profile.versions.max_major {
                return Err(ScanError::Config(format!(
                    "chain profile {} has an empty version range",
                    profile.name
                )));
            }
            if profile.hops[0]
                .checked_add(profile.first_hop_correction)
                .is_none()
            {
                return Err(ScanError::Config(format!(
                    "chain profile {} first hop overflows with its correction",
                    profile.name
                )));
            }
        }
        Ok(())
    }

    /// Resolve the scan window against an image of `len` bytes
    pub fn window_range(&self, len: usize) -> Result<Range<usize>, ScanError> {
        match self.window {
            None => Ok(0..len),
            Some(ScanWindow { start, end }) if start < end && end <= len => Ok(start..end),
            Some(ScanWindow { start, end }) => Err(ScanError::BadWindow { start, end, len }),
        }
    }

    /// Chain profile used for `version`, if orphan search is enabled
    pub fn profile_for(&self, version: &VersionInfo) -> Option<&ChainProfile> {
        if !self.find_orphans {
            return None;
        }
        select_profile(&self.orphan_profiles, version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.base_address, 0x0800_0000);
        assert_eq!(config.default_version.major, 3);
        assert!(config.find_orphans);
        assert_eq!(config.orphan_profiles.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_range() {
        let mut config = ScanConfig::default();
        assert_eq!(config.window_range(0x100).unwrap(), 0..0x100);

        config.window = Some(ScanWindow {
            start: 0x10,
            end: 0x80,
        });
        assert_eq!(config.window_range(0x100).unwrap(), 0x10..0x80);

        config.window = Some(ScanWindow {
            start: 0x10,
            end: 0x200,
        });
        assert!(matches!(
            config.window_range(0x100),
            Err(ScanError::BadWindow { end: 0x200, .. })
        ));

        config.window = Some(ScanWindow {
            start: 0x80,
            end: 0x80,
        });
        assert!(config.window_range(0x100).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ScanConfig {
            default_version: VersionInfo::assumed(7),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ScanError::Config(_))));

        config.default_version = VersionInfo::assumed(2);
        config.orphan_profiles[0].hops.clear();
        assert!(matches!(config.validate(), Err(ScanError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_overflowing_first_hop() {
        let config: ScanConfig = serde_json::from_str(
            r#"{"orphan_profiles": [{
                "name": "wide",
                "versions": {"min_major": 1, "max_major": 3},
                "hops": [2147483647],
                "first_hop_correction": 1
            }]}"#,
        )
        .unwrap();

        assert!(matches!(config.validate(), Err(ScanError::Config(_))));
        assert_eq!(
            config.orphan_profiles[0].hop_distance(0),
            i64::from(i32::MAX) + 1
        );
    }

    #[test]
    fn test_profile_for_respects_switch() {
        let mut config = ScanConfig::default();
        let version = VersionInfo::assumed(3);
        assert_eq!(config.profile_for(&version).unwrap().name, "current");

        config.find_orphans = false;
        assert!(config.profile_for(&version).is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ScanConfig =
            serde_json::from_str(r#"{"base_address": 0, "find_orphans": false}"#).unwrap();
        assert_eq!(config.base_address, 0);
        assert!(!config.find_orphans);
        assert_eq!(config.max_image_size, MAX_IMAGE_SIZE);
        assert_eq!(config.orphan_profiles, default_profiles());
    }
}
