//! Export of recovered songs: samples as WAV files, songs as JSON manifests

use anyhow::{Context, Result};
use bytes::{BufMut, Bytes, BytesMut};
use gaxrip_core::{
    constants::{DEFAULT_EXPORT_CHANNELS, DEFAULT_SAMPLE_RATE},
    gax::{GaxSong, Layout, SongHeader},
    Record, SubPointer,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Where and how exported files are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Root output directory
    pub out_dir: PathBuf,
    /// Playback rate written to WAV headers, in Hz
    pub sample_rate: u32,
    /// Channel count written to WAV headers
    pub channels: u16,
}

impl ExportConfig {
    /// Defaults rooted at `out_dir`
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_EXPORT_CHANNELS,
        }
    }

    /// Output directory named after the input file, minus its extension,
    /// relative to the working directory
    pub fn for_input(input: &str) -> Self {
        let path = Path::new(input);
        Self::new(path.file_stem().map_or_else(|| path.to_path_buf(), PathBuf::from))
    }
}

/// Files written for one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Song manifest
    pub manifest: PathBuf,
    /// WAV files, in sample-set order
    pub samples: Vec<PathBuf>,
}

/// Totals over a batch of records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportTotals {
    /// Records exported without error
    pub exported: usize,
    /// Records whose export failed
    pub failed: usize,
    /// WAV files written
    pub samples: usize,
}

/// Writes one accepted record to disk
pub trait Exporter {
    /// Record payload this exporter understands
    type Payload;

    /// Export one record
    fn export(&self, record: &Record<Self::Payload>) -> Result<ExportSummary>;
}

/// Export every record, isolating failures to the record that caused them
pub fn export_all<E: Exporter>(exporter: &E, records: &[Record<E::Payload>]) -> ExportTotals {
    let mut totals = ExportTotals::default();
    for record in records {
        match exporter.export(record) {
            Ok(summary) => {
                debug!(
                    "Exported {} with {} samples",
                    summary.manifest.display(),
                    summary.samples.len()
                );
                totals.exported += 1;
                totals.samples += summary.samples.len();
            }
            Err(e) => {
                error!(
                    "Failed to export {:#010X} ({}): {:#}",
                    record.address, record.name, e
                );
                totals.failed += 1;
            }
        }
    }
    info!(
        "Exported {} songs and {} samples ({} failed)",
        totals.exported, totals.samples, totals.failed
    );
    totals
}

/// Replace characters that are unsafe in file names
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c: char| c == ' ' || c == '.');
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Encode 8-bit unsigned PCM as a RIFF/WAVE file
pub fn encode_wav(pcm: &[u8], sample_rate: u32, channels: u16) -> Bytes {
    const BITS_PER_SAMPLE: u16 = 8;
    let block_align = channels * BITS_PER_SAMPLE / 8;
    let byte_rate = sample_rate * u32::from(block_align);

    let mut buf = BytesMut::with_capacity(44 + pcm.len() + 1);
    buf.put_slice(b"RIFF");
    buf.put_u32_le(36 + pcm.len() as u32 + (pcm.len() as u32 & 1));
    buf.put_slice(b"WAVE");

    buf.put_slice(b"fmt ");
    buf.put_u32_le(16);
    buf.put_u16_le(1);
    buf.put_u16_le(channels);
    buf.put_u32_le(sample_rate);
    buf.put_u32_le(byte_rate);
    buf.put_u16_le(block_align);
    buf.put_u16_le(BITS_PER_SAMPLE);

    buf.put_slice(b"data");
    buf.put_u32_le(pcm.len() as u32);
    buf.put_slice(pcm);
    // Chunks are word aligned
    if pcm.len() % 2 == 1 {
        buf.put_u8(0);
    }
    buf.freeze()
}

#[derive(Serialize)]
struct SampleEntry {
    index: usize,
    address: String,
    length: usize,
    signed: bool,
    file: String,
}

#[derive(Serialize)]
struct SongManifest<'a> {
    address: String,
    offset: usize,
    name: &'a str,
    title: &'a str,
    artist: &'a str,
    version: String,
    layout: Layout,
    header: &'a SongHeader,
    sub_pointers: BTreeMap<SubPointer, String>,
    patterns: Vec<Vec<u16>>,
    samples: Vec<SampleEntry>,
    raw_header: String,
}

/// Writes samples as WAV files and each song as a JSON manifest
#[derive(Debug, Clone)]
pub struct WavExporter {
    config: ExportConfig,
}

impl WavExporter {
    /// Create an exporter
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    /// Output settings
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }
}

impl Exporter for WavExporter {
    type Payload = GaxSong;

    fn export(&self, record: &Record<GaxSong>) -> Result<ExportSummary> {
        let song = &record.payload;
        let sample_dir = self.config.out_dir.join("samples").join(sanitize_file_name(
            &format!("{} - {}", song.parsed_name, song.parsed_artist),
        ));
        let song_dir = self.config.out_dir.join("songs");

        let mut summary = ExportSummary::default();
        let mut entries = Vec::with_capacity(song.samples.len());

        if !song.samples.is_empty() {
            fs::create_dir_all(&sample_dir).with_context(|| {
                format!("Failed to create directory: {}", sample_dir.display())
            })?;
        }
        for sample in &song.samples {
            let file_name = format!("{}_{:08X}.wav", sample.index, sample.address);
            let path = sample_dir.join(&file_name);
            let wav = encode_wav(
                &sample.to_unsigned(),
                self.config.sample_rate,
                self.config.channels,
            );
            fs::write(&path, &wav)
                .with_context(|| format!("Failed to write sample: {}", path.display()))?;

            entries.push(SampleEntry {
                index: sample.index,
                address: format!("{:#010X}", sample.address),
                length: sample.data.len(),
                signed: sample.signed,
                file: file_name,
            });
            summary.samples.push(path);
        }

        let manifest = SongManifest {
            address: format!("{:#010X}", record.address),
            offset: record.offset,
            name: &record.name,
            title: &song.parsed_name,
            artist: &song.parsed_artist,
            version: record.version.to_string(),
            layout: song.layout,
            header: &song.header,
            sub_pointers: record
                .sub_pointers
                .iter()
                .map(|(kind, address)| (*kind, format!("{:#010X}", address)))
                .collect(),
            patterns: song
                .channels
                .iter()
                .map(|table| table.entries.iter().map(|e| e.pattern).collect())
                .collect(),
            samples: entries,
            raw_header: hex::encode(&song.raw_header),
        };

        fs::create_dir_all(&song_dir)
            .with_context(|| format!("Failed to create directory: {}", song_dir.display()))?;
        let path = song_dir.join(format!("{}.json", sanitize_file_name(&record.name)));
        let json =
            serde_json::to_string_pretty(&manifest).context("Failed to serialize song manifest")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write manifest: {}", path.display()))?;

        summary.manifest = path;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaxrip_core::VersionInfo;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Title - Artist"), "Title - Artist");
        assert_eq!(sanitize_file_name("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_file_name("\"Song\" © Someone"), "_Song_ © Someone");
        assert_eq!(sanitize_file_name(" .. "), "_");
    }

    #[test]
    fn test_output_dir_is_input_stem() {
        assert_eq!(
            ExportConfig::for_input("roms/usa/mygame.gba").out_dir,
            PathBuf::from("mygame")
        );
        assert_eq!(ExportConfig::for_input("game").out_dir, PathBuf::from("game"));
        assert_eq!(
            ExportConfig::for_input("dump.v2.bin").out_dir,
            PathBuf::from("dump.v2")
        );
    }

    struct FailingAt(u32);

    impl Exporter for FailingAt {
        type Payload = ();

        fn export(&self, record: &Record<()>) -> Result<ExportSummary> {
            if record.address == self.0 {
                anyhow::bail!("disk full");
            }
            Ok(ExportSummary {
                manifest: PathBuf::from(format!("{}.json", record.name)),
                samples: vec![PathBuf::from("0.wav"), PathBuf::from("1.wav")],
            })
        }
    }

    fn record(address: u32, name: &str) -> Record<()> {
        Record {
            offset: (address - 0x0800_0000) as usize,
            address,
            version: VersionInfo::default(),
            name: name.to_string(),
            sub_pointers: BTreeMap::new(),
            payload: (),
        }
    }

    #[test]
    fn test_export_all_continues_after_failure() {
        let records = vec![
            record(0x0800_0100, "first"),
            record(0x0800_0200, "second"),
            record(0x0800_0300, "third"),
        ];

        let totals = export_all(&FailingAt(0x0800_0100), &records);
        assert_eq!(totals.exported, 2);
        assert_eq!(totals.failed, 1);
        assert_eq!(totals.samples, 4);

        let totals = export_all(&FailingAt(0x0800_0300), &records);
        assert_eq!(totals.exported, 2);
        assert_eq!(totals.failed, 1);
    }

    #[test]
    fn test_wav_header() {
        let wav = encode_wav(&[0x80, 0x81, 0x82], 15769, 2);

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes(wav[4..8].try_into().unwrap()), 36 + 4);
        assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 2);
        assert_eq!(u32::from_le_bytes(wav[24..28].try_into().unwrap()), 15769);
        assert_eq!(u32::from_le_bytes(wav[28..32].try_into().unwrap()), 15769 * 2);
        assert_eq!(u16::from_le_bytes([wav[34], wav[35]]), 8);
        assert_eq!(u32::from_le_bytes(wav[40..44].try_into().unwrap()), 3);
        assert_eq!(&wav[44..47], &[0x80, 0x81, 0x82]);
        assert_eq!(wav.len(), 48);
    }
}
