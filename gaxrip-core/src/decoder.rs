//! Pluggable record decoding

use crate::attempt::{AttemptContext, Rejection};
use crate::constants::{MIN_NAME_LEN, NAME_DELIMITER};
use crate::error::DecodeError;
use crate::image::Image;
use crate::types::{Record, VersionInfo};

/// Knows how to interpret bytes at an offset as a version marker or a record
///
/// Implementations must keep all per-trial state in the supplied
/// [`AttemptContext`]; the scanner creates a fresh one for every call.
pub trait Decoder {
    /// Decoder-owned record payload
    type Payload;

    /// Try to recognise a version marker at `offset`
    fn probe_version(
        &self,
        image: &Image,
        offset: usize,
        ctx: &mut AttemptContext,
    ) -> Option<VersionInfo>;

    /// Try to decode a full record of `version` at `offset`
    fn decode_record(
        &self,
        image: &Image,
        offset: usize,
        version: &VersionInfo,
        ctx: &mut AttemptContext,
    ) -> Result<Record<Self::Payload>, DecodeError>;

    /// One-line label for an accepted record, used in logs and listings
    fn describe(&self, record: &Record<Self::Payload>) -> String {
        record.name.clone()
    }
}

/// Cheap structural check separating real records from coincidental bytes
///
/// The name must be longer than [`MIN_NAME_LEN`] characters and contain
/// [`NAME_DELIMITER`].
pub fn check_name(name: &str) -> Result<(), Rejection> {
    let len = name.chars().count();
    if len <= MIN_NAME_LEN {
        return Err(Rejection::NameTooShort(len));
    }
    if !name.contains(NAME_DELIMITER) {
        return Err(Rejection::MissingDelimiter);
    }
    Ok(())
}

/// Decode a record and apply the acceptance predicate in one trial body
pub fn decode_accepted<D: Decoder + ?Sized>(
    decoder: &D,
    image: &Image,
    offset: usize,
    version: &VersionInfo,
    ctx: &mut AttemptContext,
) -> Result<Record<D::Payload>, Rejection> {
    let record = decoder.decode_record(image, offset, version, ctx)?;
    check_name(&record.name)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name_rejected() {
        assert_eq!(check_name("ab"), Err(Rejection::NameTooShort(2)));
        assert_eq!(check_name("\" © "), Err(Rejection::NameTooShort(4)));
    }

    #[test]
    fn test_five_chars_with_delimiter_accepted() {
        assert_eq!(check_name("\" © x"), Ok(()));
    }

    #[test]
    fn test_long_name_without_delimiter_rejected() {
        assert_eq!(check_name("Title Song"), Err(Rejection::MissingDelimiter));
        assert_eq!(
            check_name("\"Title\" (c) Artist"),
            Err(Rejection::MissingDelimiter)
        );
    }

    #[test]
    fn test_full_name_accepted() {
        assert_eq!(check_name("\"Main Theme\" © Manfred Linzner"), Ok(()));
    }
}
