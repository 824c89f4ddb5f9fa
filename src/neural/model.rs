//! Emotion classifier trait and core types
//!
//! Defines the interface every classifier backend implements. The pipeline
//! treats the classifier as opaque: it only sees a small RGB image going in
//! and an [`EmotionLabel`] (plus optional scores) coming out.

use std::collections::HashMap;
use std::fmt;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Labels the UI ships assets for
pub const KNOWN_LABELS: &[&str] = &[
    "happy", "sad", "angry", "surprise", "neutral", "disgust", "fear",
];

/// Label reported before the first successful classification
pub const DEFAULT_LABEL: &str = "neutral";

/// An emotion label as reported by the classifier
///
/// The vocabulary is open: anything the classifier emits is kept verbatim,
/// including values outside [`KNOWN_LABELS`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionLabel(String);

impl EmotionLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The default label, `"neutral"`
    pub fn neutral() -> Self {
        Self(DEFAULT_LABEL.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part of the closed UI vocabulary?
    pub fn is_known(&self) -> bool {
        KNOWN_LABELS.contains(&self.0.as_str())
    }

    /// Empty or whitespace only; never a valid observation
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Default for EmotionLabel {
    fn default() -> Self {
        Self::neutral()
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EmotionLabel {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EmotionLabel {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Parameters passed through to the classifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierParams {
    /// Backend-specific parameters as key-value pairs
    #[serde(flatten)]
    pub params: HashMap<String, serde_json::Value>,
}

/// Key controlling whether the backend must find a face before classifying
pub const PARAM_ENFORCE_FACE_DETECTION: &str = "enforce_face_detection";

/// Key selecting the backend's face detector
pub const PARAM_DETECTOR_BACKEND: &str = "detector_backend";

impl Default for ClassifierParams {
    /// Lenient defaults: no face-detection guarantee, fastest detector
    fn default() -> Self {
        Self::new()
            .with_param(PARAM_ENFORCE_FACE_DETECTION, false)
            .with_param(PARAM_DETECTOR_BACKEND, "opencv")
    }
}

impl ClassifierParams {
    /// Empty parameter set
    pub fn new() -> Self {
        Self {
            params: HashMap::new(),
        }
    }

    pub fn with_param<V: Serialize>(mut self, key: &str, value: V) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.params.insert(key.to_string(), value);
        }
        self
    }

    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.params
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)
    }

    /// Whether the backend should fail on frames without a detectable face
    pub fn enforce_face_detection(&self) -> bool {
        self.get_bool(PARAM_ENFORCE_FACE_DETECTION).unwrap_or(false)
    }
}

/// Result of one successful classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// The label with the highest score
    pub dominant: EmotionLabel,

    /// Optional score distribution, in the order the backend reported it
    #[serde(default)]
    pub scores: Vec<(EmotionLabel, f32)>,
}

impl Classification {
    pub fn new(dominant: impl Into<EmotionLabel>) -> Self {
        Self {
            dominant: dominant.into(),
            scores: Vec::new(),
        }
    }

    /// Build from a score distribution; the first maximum wins
    ///
    /// Returns `None` for an empty distribution.
    pub fn from_scores(scores: Vec<(EmotionLabel, f32)>) -> Option<Self> {
        let mut best: Option<&(EmotionLabel, f32)> = None;
        for entry in &scores {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        let dominant = best?.0.clone();
        Some(Self { dominant, scores })
    }

    pub fn with_scores(mut self, scores: Vec<(EmotionLabel, f32)>) -> Self {
        self.scores = scores;
        self
    }
}

/// Errors a classifier backend can report
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifierError {
    #[error("unsupported input: {0}")]
    InvalidInput(String),

    #[error("no face detected")]
    NoFace,

    #[error("detector failure: {0}")]
    Detector(String),

    /// The backend cannot serve any further request
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}

impl ClassifierError {
    /// Whether the pipeline should stop calling this classifier
    pub fn is_fatal(&self) -> bool {
        matches!(self, ClassifierError::Unavailable(_))
    }
}

/// Information about a classifier backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierInfo {
    /// Registry identifier (e.g., "luminance")
    pub id: String,

    /// Human-readable name
    pub name: String,

    pub version: String,

    pub description: String,

    /// Labels this backend is known to emit
    pub labels: Vec<String>,
}

impl ClassifierInfo {
    pub fn new(id: &str, name: &str, version: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            version: version.to_string(),
            description: description.to_string(),
            labels: KNOWN_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Trait that all emotion classifiers must implement
///
/// `classify` may block; the adapter always calls it on the blocking
/// thread pool under a timeout.
pub trait EmotionClassifier: Send + Sync {
    /// Get classifier information
    fn info(&self) -> &ClassifierInfo;

    /// Classify one RGB image
    ///
    /// # Arguments
    /// * `image` - Frame content in RGB order, already downsampled
    /// * `params` - Backend parameters
    fn classify(
        &self,
        image: &RgbImage,
        params: &ClassifierParams,
    ) -> std::result::Result<Classification, ClassifierError>;

    /// Check if the classifier is ready to use
    fn is_available(&self) -> bool {
        true
    }

    /// Get classifier ID (convenience method)
    fn id(&self) -> &str {
        &self.info().id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_label_set() {
        let label = EmotionLabel::new("contempt");
        assert!(!label.is_known());
        assert_eq!(label.as_str(), "contempt");
        assert!(EmotionLabel::from("fear").is_known());
        assert!(EmotionLabel::new("  ").is_blank());
    }

    #[test]
    fn test_default_label_is_neutral() {
        assert_eq!(EmotionLabel::default().as_str(), "neutral");
    }

    #[test]
    fn test_params_defaults_are_lenient() {
        let params = ClassifierParams::default();
        assert!(!params.enforce_face_detection());
        assert_eq!(
            params.get_string(PARAM_DETECTOR_BACKEND),
            Some("opencv".to_string())
        );
    }

    #[test]
    fn test_from_scores_first_maximum_wins() {
        let c = Classification::from_scores(vec![
            ("sad".into(), 0.2),
            ("happy".into(), 0.4),
            ("angry".into(), 0.4),
        ])
        .unwrap();
        assert_eq!(c.dominant.as_str(), "happy");
        assert_eq!(c.scores.len(), 3);

        assert!(Classification::from_scores(Vec::new()).is_none());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(ClassifierError::Unavailable("model unloaded".into()).is_fatal());
        assert!(!ClassifierError::NoFace.is_fatal());
    }
}
