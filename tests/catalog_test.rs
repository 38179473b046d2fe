//! File catalog and YUV4MPEG2 sources end to end, on temporary directories.

use crabcapture::catalog::{self, FileCatalog, SourceCatalog};
use crabcapture::config::SourceConfig;
use crabcapture::errors::CaptureError;
use crabcapture::formats::{MEDIASUBTYPE_I420, MEDIASUBTYPE_RGB32};
use crabcapture::testing::{synthetic_frame_bytes, write_y4m};
use crabcapture::{CaptureSession, PixelFormat, SessionState, Size, SourceKind};
use std::fs;
use tempfile::tempdir;

fn catalog_with_clips(dir: &std::path::Path) -> FileCatalog {
    write_y4m(dir.join("beach.y4m"), PixelFormat::Yuv420p, Size::new(16, 8), 3).unwrap();
    write_y4m(dir.join("gray.Y4M"), PixelFormat::Gray8, Size::new(4, 4), 1).unwrap();
    fs::write(dir.join("notes.txt"), "not media").unwrap();
    FileCatalog::new(dir, vec!["y4m".to_string()])
}

#[test]
fn test_enumerates_media_files_only() {
    let dir = tempdir().unwrap();
    let catalog = catalog_with_clips(dir.path());

    let sources = catalog.enumerate().unwrap();
    assert_eq!(sources.len(), 2);
    assert!(sources.iter().all(|s| s.kind == SourceKind::File));
    assert_eq!(catalog.count(), 2);
    assert_eq!(catalog.friendly_name(&sources[0]), "beach.y4m");
}

#[test]
fn test_y4m_frames_through_session() {
    let dir = tempdir().unwrap();
    let catalog = catalog_with_clips(dir.path());
    let mut session = CaptureSession::new(Box::new(catalog));

    session.open("beach.y4m").unwrap();
    assert_eq!(session.decoder_name(), Some("rawvideo"));
    session.start_capture(&MEDIASUBTYPE_I420, 16, 8).unwrap();
    assert!(!session.has_scaler());

    for n in 0..3 {
        let expected = synthetic_frame_bytes(PixelFormat::Yuv420p, Size::new(16, 8), n).unwrap();
        let frame = session.read_frame().unwrap().unwrap();
        assert_eq!(frame, expected.as_slice(), "frame {n}");
    }
    assert!(session.read_frame().unwrap().is_none());
}

#[test]
fn test_y4m_scaled_output() {
    let dir = tempdir().unwrap();
    let catalog = catalog_with_clips(dir.path());
    let mut session = CaptureSession::new(Box::new(catalog));

    session.open("gray.Y4M").unwrap();
    session.start_capture(&MEDIASUBTYPE_RGB32, 8, 8).unwrap();
    let frame = session.read_frame().unwrap().unwrap();
    assert_eq!(frame.len(), 8 * 8 * 4);
}

#[test]
fn test_rescans_between_calls() {
    let dir = tempdir().unwrap();
    let catalog = FileCatalog::new(dir.path(), vec![".y4m".to_string()]);
    let session = CaptureSession::new(Box::new(catalog));
    assert_eq!(session.device_count(), 0);

    write_y4m(dir.path().join("late.y4m"), PixelFormat::Yuv420p, Size::new(2, 2), 1).unwrap();
    assert_eq!(session.device_count(), 1);
    assert_eq!(session.device_friendly_name(0).as_deref(), Some("late.y4m"));
}

#[test]
fn test_corrupt_file_fails_to_open() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("broken.y4m"), "not a y4m header\n").unwrap();
    let mut session = CaptureSession::new(Box::new(FileCatalog::new(
        dir.path(),
        vec!["y4m".to_string()],
    )));

    assert!(matches!(
        session.open("broken.y4m"),
        Err(CaptureError::OpenFailed(_))
    ));
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn test_catalog_from_config() {
    let dir = tempdir().unwrap();
    catalog_with_clips(dir.path());
    let config = SourceConfig {
        media_directory: dir.path().to_string_lossy().into_owned(),
        ..SourceConfig::default()
    };

    let catalog = catalog::from_config(&config).unwrap();
    assert_eq!(catalog.kind(), SourceKind::File);
    assert_eq!(catalog.count(), 2);
}

#[cfg(not(feature = "device"))]
#[test]
fn test_device_kind_needs_feature() {
    let config = SourceConfig {
        kind: SourceKind::Device,
        ..SourceConfig::default()
    };
    assert!(matches!(
        catalog::from_config(&config),
        Err(CaptureError::Config(_))
    ));
}
