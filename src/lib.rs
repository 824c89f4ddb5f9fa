//! Emotive - Live Facial Emotion Sampling
//!
//! Emotive sits between a video transport and a facial-emotion classifier:
//! 1. Frames flow through a [`engine::FramePipeline`] that samples a subset
//!    for classification and burns the latest label onto every frame
//! 2. Successful classifications accumulate in a per-session ledger that
//!    analytics and export read at any time
//!
//! # Architecture
//!
//! Leaf to root:
//! - `engine::sampler`: which frames are worth a classifier call
//! - `neural`: the classifier seam and the adapter that contains its failures
//! - `state`: session ledger, current label and the session that owns them
//! - `overlay`: label banner and icon compositing
//! - `analytics` / `export`: pull-based consumers of ledger snapshots

pub mod analytics;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod neural;
pub mod overlay;
pub mod state;

pub use config::PipelineConfig;
pub use error::{EmotiveError, Result};
