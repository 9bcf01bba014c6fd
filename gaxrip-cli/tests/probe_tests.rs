use std::fs;
use tempfile::tempdir;

use gaxrip_cli::commands::{probe, ScanOptions};
use gaxrip_core::builder::ImageBuilder;

#[test]
fn test_probe_detects_marker() {
    let td = tempdir().unwrap();
    let input_path = td.path().join("game.gba");

    let mut rom = ImageBuilder::new(0x400);
    rom.put_version_marker(0x80, "GAX Sound Engine v3.05A (Jan 10 2003)");
    rom.put_pointer(0x10, 0x80);
    fs::write(&input_path, rom.build().unwrap().bytes()).unwrap();

    let version = probe::execute(input_path.to_str().unwrap(), &ScanOptions::default(), true)
        .unwrap()
        .unwrap();

    assert_eq!(version.major, 3);
    assert_eq!(version.minor, 5);
    assert_eq!(version.build, "A");
}

#[test]
fn test_probe_reports_missing_marker() {
    let td = tempdir().unwrap();
    let input_path = td.path().join("plain.gba");

    fs::write(&input_path, vec![0u8; 0x400]).unwrap();

    let version = probe::execute(input_path.to_str().unwrap(), &ScanOptions::default(), true).unwrap();
    assert!(version.is_none());
}

#[test]
fn test_probe_respects_base_address() {
    let td = tempdir().unwrap();
    let input_path = td.path().join("ewram.bin");

    // Pointers here use the EWRAM mapping
    let mut rom = ImageBuilder::with_base(0x400, 0x0200_0000);
    rom.put_version_marker(0x80, "GAX Sound Engine v2.10");
    rom.put_pointer(0x10, 0x80);
    fs::write(&input_path, rom.build().unwrap().bytes()).unwrap();

    let path = input_path.to_str().unwrap();
    assert!(probe::execute(path, &ScanOptions::default(), true)
        .unwrap()
        .is_none());

    let options = ScanOptions {
        base: Some(0x0200_0000),
        ..Default::default()
    };
    let version = probe::execute(path, &options, true)
        .unwrap()
        .unwrap();
    assert_eq!(version.major, 2);
}

#[test]
fn test_probe_follows_only_windowed_pointers() {
    let td = tempdir().unwrap();
    let input_path = td.path().join("game.gba");
    let config_path = td.path().join("window.json");

    // The only pointer to the marker sits outside the window
    let mut rom = ImageBuilder::new(0x400);
    rom.put_version_marker(0x80, "GAX Sound Engine v3.05A");
    rom.put_pointer(0x300, 0x80);
    fs::write(&input_path, rom.build().unwrap().bytes()).unwrap();
    fs::write(&config_path, r#"{"window": {"start": 0, "end": 512}}"#).unwrap();

    let path = input_path.to_str().unwrap();
    assert!(probe::execute(path, &ScanOptions::default(), true)
        .unwrap()
        .is_some());

    let options = ScanOptions {
        config: Some(config_path.to_str().unwrap().to_string()),
        ..Default::default()
    };
    assert!(probe::execute(path, &options, true).unwrap().is_none());
}
