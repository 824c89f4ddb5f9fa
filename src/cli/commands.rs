//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use log::{info, warn};
use walkdir::WalkDir;

use super::RunArgs;
use crate::analytics::{summarize as aggregate, SessionSummary};
use crate::config::PipelineConfig;
use crate::engine::{Frame, FramePipeline, PixelFormat, SamplingPolicy, StreamEvent};
use crate::error::{EmotiveError, Result};
use crate::export::{ExportReport, ReportExporter};
use crate::neural::{ClassifierRegistry, KNOWN_LABELS};
use crate::state::LedgerSnapshot;

/// File name of the ledger written by `run`
pub const LEDGER_FILE_NAME: &str = "session_ledger.json";

/// Synthetic frame size
const SYNTHETIC_WIDTH: u32 = 320;
const SYNTHETIC_HEIGHT: u32 = 240;

/// Synthetic frame spacing, roughly 30 fps
const SYNTHETIC_FRAME_MS: u64 = 33;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Replay frames through a pipeline, then write the ledger and reports.
pub fn run(args: &RunArgs) -> Result<ExportReport> {
    let config = resolve_config(args)?;
    let registry = ClassifierRegistry::with_defaults();
    let pipeline = FramePipeline::from_config(&config, &registry)?;

    if let Some(dir) = &args.annotated {
        fs::create_dir_all(dir).map_err(|e| EmotiveError::ExportDirectory {
            path: dir.clone(),
            source: e,
        })?;
    }

    pipeline.handle_event(StreamEvent::Started);
    match &args.frames {
        Some(dir) => {
            let paths = frame_paths(dir);
            info!("Replaying {} frame(s) from {}", paths.len(), dir.display());
            for (i, path) in paths.iter().enumerate() {
                match Frame::open(i as u64 + 1, path) {
                    Ok(frame) => emit(&pipeline, frame, args.annotated.as_deref())?,
                    Err(e) => warn!("Skipping frame: {}", e),
                }
            }
        }
        None => {
            info!("Replaying {} synthetic frame(s)", args.synthetic);
            for seq in 1..=args.synthetic {
                emit(&pipeline, synthetic_frame(seq), args.annotated.as_deref())?;
            }
        }
    }
    pipeline.handle_event(StreamEvent::Stopped);

    let session = pipeline.session();
    let stats = pipeline.shutdown();
    let snapshot = session.snapshot();

    fs::create_dir_all(&args.output).map_err(|e| EmotiveError::ExportDirectory {
        path: args.output.clone(),
        source: e,
    })?;
    let ledger_path = args.output.join(LEDGER_FILE_NAME);
    fs::write(&ledger_path, serde_json::to_string_pretty(&snapshot)?).map_err(|e| {
        EmotiveError::ExportWrite {
            path: ledger_path.clone(),
            source: e,
        }
    })?;

    println!("Session {}", session.id());
    println!(
        "Frames: {} seen, {} sampled, {} recorded, {} skipped, {} dropped",
        stats.seen, stats.sampled, stats.succeeded, stats.skipped, stats.dropped
    );
    print_summary(&aggregate(&snapshot));

    let exporter = ReportExporter::new(config.export.clone())?;
    let report = exporter.export_to_dir(&snapshot, &args.output, now())?;
    print_report(&report);
    println!("Ledger: {}", ledger_path.display());
    Ok(report)
}

/// Print the summary of a saved ledger.
pub fn summarize(ledger: &Path, json: bool) -> Result<()> {
    let snapshot = load_ledger(ledger)?;
    let summary = aggregate(&snapshot);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

/// Export reports from a saved ledger.
pub fn export(ledger: &Path, output: &Path, config: Option<&Path>) -> Result<ExportReport> {
    let options = match config {
        Some(path) => PipelineConfig::from_file(path)?.export,
        None => PipelineConfig::default().export,
    };
    let snapshot = load_ledger(ledger)?;
    let report = ReportExporter::new(options)?.export_to_dir(&snapshot, output, now())?;
    print_report(&report);
    Ok(report)
}

/// List known labels and registered classifiers.
pub fn labels() -> Result<()> {
    println!("Known labels: {}", KNOWN_LABELS.join(", "));
    println!();
    println!("Classifiers:");
    println!("{:-<60}", "");
    for info in ClassifierRegistry::with_defaults().list() {
        println!("{:<12} {} v{}", info.id, info.name, info.version);
        println!("{:<12} {}", "", info.description);
    }
    println!("{:-<60}", "");
    Ok(())
}

/// Config file (or defaults) with command-line overrides applied
pub fn resolve_config(args: &RunArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(classifier) = &args.classifier {
        config.inference.classifier = classifier.clone();
    }
    if let Some(stride) = args.stride {
        config.sampling = SamplingPolicy::EveryNth { stride };
    }
    config.validate()?;
    Ok(config)
}

/// Image files directly under `dir`, sorted by file name
pub fn frame_paths(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
                .map_or(false, |ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
        })
        .map(|entry| entry.into_path())
        .collect();
    paths.sort();
    paths
}

/// Uniform gray frame whose brightness sweeps slowly, so the luminance
/// classifier walks through its labels
pub fn synthetic_frame(seq: u64) -> Frame {
    let level = ((seq / 10) * 9 % 256) as u8;
    Frame::filled(
        seq,
        PixelFormat::Bgr24,
        SYNTHETIC_WIDTH,
        SYNTHETIC_HEIGHT,
        [level, level, level],
    )
    .with_captured_at(Duration::from_millis(seq * SYNTHETIC_FRAME_MS))
}

pub fn load_ledger(path: &Path) -> Result<LedgerSnapshot> {
    let content = fs::read_to_string(path).map_err(|e| EmotiveError::LedgerRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&content)?)
}

fn emit(pipeline: &FramePipeline, frame: Frame, annotated: Option<&Path>) -> Result<()> {
    let seq = frame.sequence();
    let out = pipeline.process_frame(frame);
    if let Some(dir) = annotated {
        let path = dir.join(format!("frame_{:06}.png", seq));
        out.to_rgb().save(&path).map_err(|e| EmotiveError::ExportWrite {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?;
    }
    Ok(())
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn print_summary(summary: &SessionSummary) {
    let Some(stats) = summary.stats() else {
        println!("No observations recorded.");
        return;
    };

    println!("{:-<60}", "");
    println!("Total samples: {}", stats.total);
    println!(
        "Dominant emotion: {} ({:.1}%)",
        stats.dominant.label,
        stats.dominant.share * 100.0
    );
    for count in &stats.counts {
        println!(
            "  {:<10} {:>5}  {:>5.1}%",
            count.label.as_str(),
            count.count,
            count.share * 100.0
        );
    }
    println!(
        "From {} to {}",
        stats.first_at.format("%H:%M:%S"),
        stats.last_at.format("%H:%M:%S")
    );
    println!("{:-<60}", "");
}

fn print_report(report: &ExportReport) {
    for artifact in [&report.csv, &report.document] {
        println!(
            "Wrote {} ({} bytes, sha256 {})",
            artifact.path.display(),
            artifact.bytes,
            artifact.sha256
        );
    }
}
