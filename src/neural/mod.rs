//! Emotion classifier interfaces and implementations
//!
//! This module provides:
//! - `EmotionClassifier` trait for all classifier backends
//! - Classifier registry
//! - `InferenceAdapter`, the only caller of a classifier
//! - Mock implementations for testing and the CLI

mod adapter;
mod mock;
mod model;
mod registry;

pub use adapter::{AdapterSettings, InferenceAdapter, InferenceOutcome, SkipReason};
pub use mock::*;
pub use model::{
    Classification, ClassifierError, ClassifierInfo, ClassifierParams, EmotionClassifier,
    EmotionLabel, DEFAULT_LABEL, KNOWN_LABELS, PARAM_DETECTOR_BACKEND,
    PARAM_ENFORCE_FACE_DETECTION,
};
pub use registry::{ClassifierRegistry, DEFAULT_CLASSIFIER};
