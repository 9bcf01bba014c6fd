//! Decoder for GAX Sound Engine songs
//!
//! Two header layouts exist. Engines before 3.0 ("legacy") keep the song
//! name behind a pointer and store signed samples; 3.x engines ("current")
//! append the name to the header and store unsigned samples.
//!
//! Header (both layouts, little-endian, 4-byte aligned):
//!
//! | Offset | Field |
//! |--------|-------|
//! | 0x00 | u16 channel count |
//! | 0x02 | u16 rows per pattern |
//! | 0x04 | u16 patterns per channel |
//! | 0x06 | u16 loop point |
//! | 0x08 | u16 volume |
//! | 0x0C | ptr sequence data |
//! | 0x10 | ptr instrument set |
//! | 0x14 | ptr sample set |
//! | 0x18 | u16 sample rate |
//! | 0x1A | u16 FX sample rate (current) |
//! | 0x1C | ptr name (legacy) / u8 FX channel count (current) |
//! | 0x20 | ptr channel tables, one per channel |

use crate::attempt::AttemptContext;
use crate::constants::{
    INSTRUMENT_SET_FIELD, LEGACY_NAME_FIELD, MAX_CHANNELS, MAX_FX_CHANNELS, MAX_NAME_LEN,
    MAX_PATTERNS_PER_CHANNEL, MAX_ROWS_PER_PATTERN, MAX_SAMPLES, MAX_VERSION_STRING_LEN,
    NAME_DELIMITER, POINTER_ALIGN, POINTER_SIZE, SAMPLE_ENTRY_SIZE, SAMPLE_SET_FIELD,
    SEQUENCE_FIELD, SONG_HEADER_SIZE, VERSION_PREFIX,
};
use crate::decoder::Decoder;
use crate::error::DecodeError;
use crate::image::Image;
use crate::types::{Record, SubPointer, VersionInfo};
use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;

/// Header layout family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Engines 1.x and 2.x
    Legacy,
    /// Engines 3.x
    Current,
}

impl Layout {
    /// Layout used by a given engine version
    pub fn for_version(version: &VersionInfo) -> Result<Self, DecodeError> {
        match version.major {
            1 | 2 => Ok(Layout::Legacy),
            3 => Ok(Layout::Current),
            other => Err(DecodeError::UnsupportedVersion(other)),
        }
    }

    /// Whether samples are stored as signed 8-bit PCM
    pub fn signed_samples(&self) -> bool {
        matches!(self, Layout::Legacy)
    }
}

/// Fixed song header fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongHeader {
    /// Music channels, each with its own pattern order
    pub num_channels: u16,
    /// Rows in every pattern
    pub rows_per_pattern: u16,
    /// Length of each channel's pattern order
    pub patterns_per_channel: u16,
    /// Pattern order index playback loops back to
    pub loop_point: u16,
    /// Master volume
    pub volume: u16,
    /// Mixing rate in Hz; zero on some legacy songs
    pub sample_rate: u16,
    /// Always zero for legacy songs
    pub fx_sample_rate: u16,
    /// Always zero for legacy songs
    pub num_fx_channels: u8,
}

/// One step of a channel's pattern order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceEntry {
    /// Pattern played at this step
    pub pattern: u16,
    /// Semitone offset applied to the pattern
    pub transpose: i8,
}

/// Pattern order of a single channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTable {
    /// Absolute address of the table
    pub address: u32,
    /// One entry per pattern-order step
    pub entries: Vec<SequenceEntry>,
}

/// A PCM sample referenced by the sample set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Position in the sample set
    pub index: usize,
    /// Absolute address of the sample data
    pub address: u32,
    /// Raw 8-bit PCM
    pub data: Bytes,
    /// Whether `data` is signed
    pub signed: bool,
}

impl Sample {
    /// Sample data as unsigned 8-bit PCM
    pub fn to_unsigned(&self) -> Vec<u8> {
        if self.signed {
            self.data.iter().map(|b| b.wrapping_add(128)).collect()
        } else {
            self.data.to_vec()
        }
    }
}

/// Decoded song payload
#[derive(Debug, Clone, PartialEq)]
pub struct GaxSong {
    /// Header layout the song was decoded with
    pub layout: Layout,
    /// Fixed header fields
    pub header: SongHeader,
    /// Pattern order per channel
    pub channels: Vec<ChannelTable>,
    /// Non-empty samples of the sample set
    pub samples: Vec<Sample>,
    /// Title without the surrounding quote
    pub parsed_name: String,
    /// Text after the title/artist delimiter
    pub parsed_artist: String,
    /// Raw header bytes, channel table included
    pub raw_header: Bytes,
}

/// Split a `"Title" © Artist` name into title and artist
pub fn split_name(name: &str) -> (String, String) {
    match name.split_once(NAME_DELIMITER) {
        Some((title, artist)) => (
            title.trim_start_matches('"').to_string(),
            artist.trim_end().to_string(),
        ),
        None => (name.to_string(), String::new()),
    }
}

/// Parse a version marker such as `GAX Sound Engine v3.05A (Jan 10 2003)`
pub fn parse_version_marker(raw: &[u8]) -> Option<VersionInfo> {
    let text = std::str::from_utf8(raw).ok()?;
    let rest = text.strip_prefix(VERSION_PREFIX)?;
    let rest = rest
        .strip_prefix('v')
        .or_else(|| rest.strip_prefix('V'))
        .unwrap_or(rest);

    let (major, rest) = rest.split_once('.')?;
    let major: u8 = major.parse().ok()?;
    if !(1..=3).contains(&major) {
        return None;
    }

    let minor_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if minor_len == 0 {
        return None;
    }
    let minor: u8 = rest[..minor_len].parse().ok()?;

    let build: String = rest[minor_len..]
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();

    Some(VersionInfo {
        major,
        minor,
        build,
        raw: text.to_string(),
    })
}

/// Decoder for GAX songs and version markers
#[derive(Debug, Clone, Copy, Default)]
pub struct GaxDecoder;

impl GaxDecoder {
    /// Create a decoder
    pub fn new() -> Self {
        Self
    }

    fn follow(
        &self,
        image: &Image,
        field: usize,
        ctx: &mut AttemptContext,
    ) -> Result<(u32, usize), DecodeError> {
        let address = image.read_u32(field)?;
        let target = image
            .resolve(address)
            .ok_or(DecodeError::InvalidPointer(address))?;
        ctx.record_pointer(field, target);
        Ok((address, target))
    }

    fn read_header(
        &self,
        image: &Image,
        offset: usize,
        layout: Layout,
    ) -> Result<SongHeader, DecodeError> {
        let num_channels = image.read_u16(offset)?;
        check_range("num_channels", num_channels, 1, MAX_CHANNELS)?;

        let rows_per_pattern = image.read_u16(offset + 0x02)?;
        check_range("rows_per_pattern", rows_per_pattern, 1, MAX_ROWS_PER_PATTERN)?;

        let patterns_per_channel = image.read_u16(offset + 0x04)?;
        check_range(
            "patterns_per_channel",
            patterns_per_channel,
            1,
            MAX_PATTERNS_PER_CHANNEL,
        )?;

        let loop_point = image.read_u16(offset + 0x06)?;
        if loop_point >= patterns_per_channel {
            return Err(DecodeError::FieldOutOfRange {
                field: "loop_point",
                value: u32::from(loop_point),
            });
        }

        let volume = image.read_u16(offset + 0x08)?;
        let sample_rate = image.read_u16(offset + 0x18)?;

        let (fx_sample_rate, num_fx_channels) = match layout {
            Layout::Legacy => (0, 0),
            Layout::Current => {
                let fx_channels = image.read_u8(offset + 0x1C)?;
                if fx_channels > MAX_FX_CHANNELS {
                    return Err(DecodeError::FieldOutOfRange {
                        field: "num_fx_channels",
                        value: u32::from(fx_channels),
                    });
                }
                (image.read_u16(offset + 0x1A)?, fx_channels)
            }
        };

        Ok(SongHeader {
            num_channels,
            rows_per_pattern,
            patterns_per_channel,
            loop_point,
            volume,
            sample_rate,
            fx_sample_rate,
            num_fx_channels,
        })
    }

    fn read_channel_table(
        &self,
        image: &Image,
        address: u32,
        table: usize,
        patterns: u16,
        ctx: &mut AttemptContext,
    ) -> Result<ChannelTable, DecodeError> {
        ctx.cached(table, |_| {
            let raw = image.slice(table, usize::from(patterns) * 4)?;
            let entries = raw
                .chunks_exact(4)
                .map(|e| SequenceEntry {
                    pattern: u16::from_le_bytes([e[0], e[1]]),
                    transpose: e[2] as i8,
                })
                .collect();
            Ok(ChannelTable { address, entries })
        })
    }

    fn read_samples(
        &self,
        image: &Image,
        set: usize,
        signed: bool,
        ctx: &mut AttemptContext,
    ) -> Result<Vec<Sample>, DecodeError> {
        ctx.cached(set, |ctx| {
            let mut samples = Vec::new();
            for index in 0..MAX_SAMPLES {
                let entry = set + index * SAMPLE_ENTRY_SIZE;
                if image.read_u32(entry)? == 0 {
                    return Ok(samples);
                }
                let (address, data) = self.follow(image, entry, ctx)?;
                let len = image.read_u32(entry + POINTER_SIZE)? as usize;
                if len == 0 {
                    continue;
                }
                samples.push(Sample {
                    index,
                    address,
                    data: image.slice_bytes(data, len)?,
                    signed,
                });
            }
            Err(DecodeError::FieldOutOfRange {
                field: "sample_set",
                value: MAX_SAMPLES as u32,
            })
        })
    }

    fn read_name(&self, image: &Image, offset: usize) -> Result<String, DecodeError> {
        let raw = image.read_cstring(offset, MAX_NAME_LEN)?;
        let (name, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(raw);
        if name.chars().any(char::is_control) {
            return Err(DecodeError::BadString(offset));
        }
        Ok(name.into_owned())
    }
}

impl Decoder for GaxDecoder {
    type Payload = GaxSong;

    fn probe_version(
        &self,
        image: &Image,
        offset: usize,
        _ctx: &mut AttemptContext,
    ) -> Option<VersionInfo> {
        let raw = image.read_cstring(offset, MAX_VERSION_STRING_LEN).ok()?;
        parse_version_marker(raw)
    }

    fn decode_record(
        &self,
        image: &Image,
        offset: usize,
        version: &VersionInfo,
        ctx: &mut AttemptContext,
    ) -> Result<Record<GaxSong>, DecodeError> {
        if offset % POINTER_ALIGN != 0 {
            return Err(DecodeError::Misaligned(offset));
        }
        let layout = Layout::for_version(version)?;
        let header = self.read_header(image, offset, layout)?;

        let (sequence, _) = self.follow(image, offset + SEQUENCE_FIELD, ctx)?;
        let (instruments, _) = self.follow(image, offset + INSTRUMENT_SET_FIELD, ctx)?;
        let (sample_set_addr, sample_set) = self.follow(image, offset + SAMPLE_SET_FIELD, ctx)?;

        let table_start = offset + SONG_HEADER_SIZE;
        let mut channels = Vec::with_capacity(usize::from(header.num_channels));
        for channel in 0..usize::from(header.num_channels) {
            let (address, table) = self.follow(image, table_start + channel * POINTER_SIZE, ctx)?;
            channels.push(self.read_channel_table(
                image,
                address,
                table,
                header.patterns_per_channel,
                ctx,
            )?);
        }
        let table_end = table_start + channels.len() * POINTER_SIZE;

        let name = match layout {
            Layout::Legacy => {
                let (_, name_at) = self.follow(image, offset + LEGACY_NAME_FIELD, ctx)?;
                self.read_name(image, name_at)?
            }
            Layout::Current => self.read_name(image, table_end)?,
        };

        let samples = self.read_samples(image, sample_set, layout.signed_samples(), ctx)?;
        let (parsed_name, parsed_artist) = split_name(&name);

        let mut sub_pointers = BTreeMap::new();
        sub_pointers.insert(SubPointer::SequenceData, sequence);
        sub_pointers.insert(SubPointer::InstrumentSet, instruments);
        sub_pointers.insert(SubPointer::SampleSet, sample_set_addr);

        Ok(Record {
            offset,
            address: image.address_of(offset),
            version: version.clone(),
            name,
            sub_pointers,
            payload: GaxSong {
                layout,
                header,
                channels,
                samples,
                parsed_name,
                parsed_artist,
                raw_header: image.slice_bytes(offset, table_end - offset)?,
            },
        })
    }

    fn describe(&self, record: &Record<GaxSong>) -> String {
        format!(
            "{} - {}",
            record.payload.parsed_name, record.payload.parsed_artist
        )
    }
}

fn check_range(field: &'static str, value: u16, min: u16, max: u16) -> Result<(), DecodeError> {
    if value < min || value > max {
        return Err(DecodeError::FieldOutOfRange {
            field,
            value: u32::from(value),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attempt::{attempt, Attempt, Rejection};
    use crate::builder::{ImageBuilder, SongBuilder};

    #[test]
    fn test_parse_version_marker() {
        let v = parse_version_marker(b"GAX Sound Engine v3.05A (Jan 10 2003)").unwrap();
        assert_eq!((v.major, v.minor, v.build.as_str()), (3, 5, "A"));
        assert_eq!(v.raw, "GAX Sound Engine v3.05A (Jan 10 2003)");

        let v = parse_version_marker(b"GAX Sound Engine 2.02B").unwrap();
        assert_eq!((v.major, v.minor, v.build.as_str()), (2, 2, "B"));

        let v = parse_version_marker(b"GAX Sound Engine v3.05Plus").unwrap();
        assert_eq!(v.build, "Plus");
    }

    #[test]
    fn test_parse_version_marker_rejects_noise() {
        assert!(parse_version_marker(b"GAX Sound Engine").is_none());
        assert!(parse_version_marker(b"GAX Sound Engine v9.00").is_none());
        assert!(parse_version_marker(b"GAX Sound Engine v3.").is_none());
        assert!(parse_version_marker(b"Some other string v3.05").is_none());
    }

    #[test]
    fn test_split_name() {
        assert_eq!(
            split_name("\"Title Theme\" © Manfred Linzner"),
            ("Title Theme".to_string(), "Manfred Linzner".to_string())
        );
        assert_eq!(split_name("plain"), ("plain".to_string(), String::new()));
    }

    #[test]
    fn test_decode_current_song() {
        let mut rom = ImageBuilder::new(0x800);
        let song = SongBuilder::current("\"Boss\" © Composer")
            .channels(3)
            .sample(vec![0x80, 0x90, 0xA0])
            .write(&mut rom, 0x100);
        let image = rom.build().unwrap();
        let version = VersionInfo::assumed(3);

        let record = attempt(song.offset, |ctx| {
            Ok(GaxDecoder.decode_record(&image, song.offset, &version, ctx)?)
        })
        .accepted()
        .unwrap();

        assert_eq!(record.name, "\"Boss\" © Composer");
        assert_eq!(record.payload.parsed_name, "Boss");
        assert_eq!(record.payload.parsed_artist, "Composer");
        assert_eq!(GaxDecoder.describe(&record), "Boss - Composer");
        assert_eq!(record.payload.channels.len(), 3);
        assert_eq!(record.payload.samples.len(), 1);
        assert!(!record.payload.samples[0].signed);
        assert_eq!(
            record.sub_pointer(SubPointer::InstrumentSet),
            Some(song.instrument_set)
        );
    }

    #[test]
    fn test_decode_legacy_song_signed_samples() {
        let mut rom = ImageBuilder::new(0x800);
        let song = SongBuilder::legacy("\"Intro\" © Someone")
            .sample(vec![0x00, 0x7F, 0x80])
            .write(&mut rom, 0x200);
        let image = rom.build().unwrap();

        let record = attempt(song.offset, |ctx| {
            Ok(GaxDecoder.decode_record(&image, song.offset, &VersionInfo::assumed(2), ctx)?)
        })
        .accepted()
        .unwrap();

        assert_eq!(record.payload.layout, Layout::Legacy);
        let sample = &record.payload.samples[0];
        assert!(sample.signed);
        assert_eq!(sample.to_unsigned(), vec![0x80, 0xFF, 0x00]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let image = Image::from_rom(vec![0xFFu8; 0x100]).unwrap();
        let out = attempt(0, |ctx| {
            Ok(GaxDecoder.decode_record(&image, 0, &VersionInfo::assumed(3), ctx)?)
        });
        assert!(matches!(out, Attempt::Rejected(_)));
    }

    #[test]
    fn test_decode_rejects_misaligned() {
        let image = Image::from_rom(vec![0u8; 0x100]).unwrap();
        let out = attempt(2, |ctx| {
            Ok(GaxDecoder.decode_record(&image, 2, &VersionInfo::assumed(3), ctx)?)
        });
        assert_eq!(
            out,
            Attempt::Rejected(Rejection::Decode(DecodeError::Misaligned(2)))
        );
    }

    #[test]
    fn test_shared_channel_tables_decoded_once() {
        let mut rom = ImageBuilder::new(0x800);
        let song = SongBuilder::current("\"Loop\" © Someone")
            .channels(4)
            .shared_channel_table()
            .write(&mut rom, 0x40);
        let image = rom.build().unwrap();

        let cached = attempt(song.offset, |ctx| {
            let record = GaxDecoder.decode_record(&image, song.offset, &VersionInfo::assumed(3), ctx)?;
            Ok((record.payload.channels.len(), ctx.cached_objects()))
        })
        .accepted()
        .unwrap();

        // One channel table plus the sample set
        assert_eq!(cached, (4, 2));
    }

    #[test]
    fn test_probe_version() {
        let mut rom = ImageBuilder::new(0x100);
        rom.put_bytes(0x20, b"GAX Sound Engine v3.05A\0");
        let image = rom.build().unwrap();

        let found = attempt(0x20, |ctx| Ok(GaxDecoder.probe_version(&image, 0x20, ctx)))
            .accepted()
            .flatten()
            .unwrap();
        assert_eq!(found.major, 3);

        let missing = attempt(0x24, |ctx| Ok(GaxDecoder.probe_version(&image, 0x24, ctx)))
            .accepted()
            .flatten();
        assert!(missing.is_none());
    }
}
