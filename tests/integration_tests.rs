//! Integration Tests
//!
//! End-to-end tests for the Emotive session, analytics and export path.

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use emotive::analytics::{summarize, SessionSummary};
use emotive::config::PipelineConfig;
use emotive::engine::{Frame, FramePipeline, PixelFormat, SamplingPolicy, StreamEvent};
use emotive::export::{ExportOptions, ReportExporter, CSV_FILE_NAME};
use emotive::neural::{ClassifierRegistry, ScriptedClassifier};
use emotive::overlay::{IconSet, OverlayRenderer, OverlayStyle};
use emotive::state::{LedgerSnapshot, Session, SteppingClock};

fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(h, m, s))
        .unwrap()
}

fn stepping_session(step_secs: i64) -> Session {
    Session::with_clock(Arc::new(SteppingClock::new(
        at(10, 0, 0),
        ChronoDuration::seconds(step_secs),
    )))
}

// === Analytics ===

#[test]
fn test_dominant_label() {
    let session = stepping_session(1);
    for (i, label) in ["happy", "happy", "sad"].into_iter().enumerate() {
        session.record(i as u64 + 1, label.into());
    }

    let summary = summarize(&session.snapshot());
    let dominant = summary.dominant().unwrap();
    assert_eq!(dominant.label.as_str(), "happy");
    assert_eq!(dominant.count, 2);
}

#[test]
fn test_empty_session_has_no_data() {
    let session = Session::new();
    assert_eq!(summarize(&session.snapshot()), SessionSummary::NoData);
}

// === Export ===

#[test]
fn test_csv_export_matches_reference() {
    let session = stepping_session(3);
    session.record(1, "neutral".into());
    session.record(2, "happy".into());

    let exporter = ReportExporter::new(ExportOptions::default()).unwrap();
    assert_eq!(
        exporter.csv(&session.snapshot()),
        "Time,Emotion\n10:00:00,neutral\n10:00:03,happy\n"
    );
}

#[test]
fn test_document_over_25_observations_lists_last_20() {
    let session = stepping_session(1);
    for seq in 1..=25 {
        let label = if seq % 3 == 0 { "angry" } else { "neutral" };
        session.record(seq, label.into());
    }

    let exporter = ReportExporter::new(ExportOptions::default()).unwrap();
    let pdf = String::from_utf8(exporter.document(&session.snapshot(), at(11, 0, 0))).unwrap();

    assert!(pdf.contains("(Total samples: 25) Tj"));
    let rows = pdf.matches("(angry) Tj").count() + pdf.matches("(neutral) Tj").count();
    assert_eq!(rows, 20);
    assert!(!pdf.contains("(10:00:04) Tj"));
    assert!(pdf.contains("(10:00:05) Tj"));
    assert!(pdf.contains("(10:00:24) Tj"));
}

#[test]
fn test_export_to_unwritable_directory_fails() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("occupied");
    fs::write(&file, b"").unwrap();

    let exporter = ReportExporter::new(ExportOptions::default()).unwrap();
    let result = exporter.export_to_dir(&LedgerSnapshot::default(), &file, at(9, 0, 0));
    let err = result.unwrap_err();
    assert!(err.is_recoverable());
    assert!(!err.recovery_suggestions().is_empty());
}

#[test]
fn test_snapshot_taken_before_export_is_stable() {
    let session = stepping_session(1);
    session.record(1, "fear".into());
    let snapshot = session.snapshot();
    session.record(2, "happy".into());

    let dir = tempdir().unwrap();
    let exporter = ReportExporter::new(ExportOptions::default()).unwrap();
    exporter.export_to_dir(&snapshot, dir.path(), at(9, 0, 0)).unwrap();

    let csv = fs::read_to_string(dir.path().join(CSV_FILE_NAME)).unwrap();
    assert_eq!(csv, "Time,Emotion\n10:00:00,fear\n");
    assert_eq!(session.ledger().len(), 2);
}

// === Overlay ===

#[test]
fn test_icon_wider_than_right_margin_is_clipped() {
    let style = OverlayStyle {
        icon_origin: (600, 10),
        icon_size: 100,
        ..OverlayStyle::default()
    };
    let mut icons = IconSet::empty(style.icon_size);
    icons.insert("happy", RgbaImage::from_pixel(100, 100, Rgba([255, 0, 0, 255])));
    let renderer = OverlayRenderer::new(style, icons).unwrap();

    let frame = Frame::filled(1, PixelFormat::Bgr24, 640, 480, [0, 0, 0]);
    let out = renderer.render(frame, &"happy".into());

    assert_eq!((out.width(), out.height()), (640, 480));
    assert_eq!(out.rgb_at(599, 50), Some([0, 0, 0]));
    assert_eq!(out.rgb_at(600, 50), Some([255, 0, 0]));
    assert_eq!(out.rgb_at(639, 109), Some([255, 0, 0]));
    assert_eq!(out.rgb_at(639, 110), Some([0, 0, 0]));
    // BGR frame stores red as the last byte
    assert_eq!(out.pixels().get_pixel(639, 50).0, [0, 0, 255]);
}

// === Config to pipeline ===

#[test]
fn test_pipeline_from_config_file_with_missing_icon() {
    let dir = tempdir().unwrap();
    let icon = dir.path().join("happy.png");
    RgbaImage::from_pixel(8, 8, Rgba([0, 0, 255, 255]))
        .save(&icon)
        .unwrap();

    let mut icons = BTreeMap::new();
    icons.insert("happy".to_string(), icon);
    icons.insert("sad".to_string(), dir.path().join("missing.png"));

    let mut config = PipelineConfig {
        sampling: SamplingPolicy::EveryNth { stride: 2 },
        ..PipelineConfig::default()
    };
    config.inference.classifier = "scripted".to_string();
    config.overlay.icons = icons;
    config.overlay.style.icon_origin = (0, 100);
    config.overlay.style.icon_size = 16;

    let path = dir.path().join("emotive.json");
    fs::write(&path, config.to_json().unwrap()).unwrap();
    let loaded = PipelineConfig::from_file(&path).unwrap();

    let mut registry = ClassifierRegistry::with_defaults();
    registry.register(Arc::new(ScriptedClassifier::new(["happy"])));
    let pipe = FramePipeline::from_config(&loaded, &registry).unwrap();
    assert_eq!(pipe.classifier_id(), "scripted");

    pipe.handle_event(StreamEvent::Started);
    pipe.process_frame(Frame::filled(1, PixelFormat::Rgb24, 200, 200, [0, 0, 0]));
    let out = pipe.process_frame(Frame::filled(2, PixelFormat::Rgb24, 200, 200, [0, 0, 0]));

    // The committed label's icon is drawn on the same frame
    assert_eq!(out.rgb_at(8, 108), Some([0, 0, 255]));
    assert_eq!(pipe.session().current_label().as_str(), "happy");
}
