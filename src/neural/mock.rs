//! Mock classifier implementations
//!
//! None of these look at faces. They exist so the pipeline, the CLI and the
//! tests can exercise every outcome the adapter has to handle: steady
//! labels, scripted sequences, hard failures and stalls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use image::RgbImage;

use super::model::{
    Classification, ClassifierError, ClassifierInfo, ClassifierParams, EmotionClassifier,
    EmotionLabel,
};

/// Below this luma variance the image is treated as having no face
const FLAT_VARIANCE: f64 = 4.0;

/// Buckets mean brightness onto the label vocabulary, darkest first
const LUMA_BUCKETS: &[&str] = &[
    "fear", "sad", "angry", "neutral", "surprise", "disgust", "happy",
];

/// Deterministic classifier driven by image brightness (MOCK)
///
/// Produces a score per label that falls off with distance from the mean
/// luma, so different pictures yield different, repeatable labels.
pub struct LuminanceClassifier {
    info: ClassifierInfo,
}

impl LuminanceClassifier {
    pub fn new() -> Self {
        Self {
            info: ClassifierInfo::new(
                "luminance",
                "Luminance Mock",
                "1.0-mock",
                "Maps mean brightness onto emotion labels (MOCK)",
            ),
        }
    }
}

impl Default for LuminanceClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn luma_stats(image: &RgbImage) -> (f64, f64) {
    let n = (image.width() as f64) * (image.height() as f64);
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for px in image.pixels() {
        let [r, g, b] = px.0;
        let y = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
        sum += y;
        sum_sq += y * y;
    }
    let mean = sum / n;
    (mean, (sum_sq / n - mean * mean).max(0.0))
}

impl EmotionClassifier for LuminanceClassifier {
    fn info(&self) -> &ClassifierInfo {
        &self.info
    }

    fn classify(
        &self,
        image: &RgbImage,
        params: &ClassifierParams,
    ) -> Result<Classification, ClassifierError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(ClassifierError::InvalidInput("empty image".to_string()));
        }

        let (mean, variance) = luma_stats(image);
        if params.enforce_face_detection() && variance < FLAT_VARIANCE {
            return Err(ClassifierError::NoFace);
        }

        let step = 256.0 / LUMA_BUCKETS.len() as f64;
        let scores = LUMA_BUCKETS
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let center = step * (i as f64 + 0.5);
                let score = 1.0 - ((center - mean).abs() / 256.0);
                (EmotionLabel::from(*label), score as f32)
            })
            .collect();

        Classification::from_scores(scores)
            .ok_or_else(|| ClassifierError::Detector("no scores produced".to_string()))
    }
}

/// Replays a fixed script of results, cycling when exhausted (MOCK)
pub struct ScriptedClassifier {
    info: ClassifierInfo,
    script: Vec<Result<String, ClassifierError>>,
    cursor: AtomicUsize,
}

impl ScriptedClassifier {
    /// Script of labels, all successful
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        Self::from_results(labels.into_iter().map(|l| Ok(l.into())))
    }

    /// Script mixing successes and failures
    pub fn from_results(results: impl IntoIterator<Item = Result<String, ClassifierError>>) -> Self {
        Self {
            info: ClassifierInfo::new(
                "scripted",
                "Scripted Mock",
                "1.0-mock",
                "Returns a predefined sequence of results (MOCK)",
            ),
            script: results.into_iter().collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Number of classify calls served so far
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

impl EmotionClassifier for ScriptedClassifier {
    fn info(&self) -> &ClassifierInfo {
        &self.info
    }

    fn classify(
        &self,
        _image: &RgbImage,
        _params: &ClassifierParams,
    ) -> Result<Classification, ClassifierError> {
        if self.script.is_empty() {
            return Err(ClassifierError::Detector("empty script".to_string()));
        }
        let i = self.cursor.fetch_add(1, Ordering::SeqCst);
        match &self.script[i % self.script.len()] {
            Ok(label) => Ok(Classification::new(label.as_str())),
            Err(e) => Err(e.clone()),
        }
    }
}

/// Fails every call with the same error (MOCK)
pub struct FailingClassifier {
    info: ClassifierInfo,
    error: ClassifierError,
}

impl FailingClassifier {
    pub fn new(error: ClassifierError) -> Self {
        Self {
            info: ClassifierInfo::new(
                "failing",
                "Failing Mock",
                "1.0-mock",
                "Rejects every frame (MOCK)",
            ),
            error,
        }
    }
}

impl Default for FailingClassifier {
    fn default() -> Self {
        Self::new(ClassifierError::Detector("face detector crashed".to_string()))
    }
}

impl EmotionClassifier for FailingClassifier {
    fn info(&self) -> &ClassifierInfo {
        &self.info
    }

    fn classify(
        &self,
        _image: &RgbImage,
        _params: &ClassifierParams,
    ) -> Result<Classification, ClassifierError> {
        Err(self.error.clone())
    }
}

/// Sleeps before answering, to exercise timeouts (MOCK)
pub struct StallingClassifier {
    info: ClassifierInfo,
    delay: Duration,
    label: String,
}

impl StallingClassifier {
    pub fn new(delay: Duration, label: &str) -> Self {
        Self {
            info: ClassifierInfo::new(
                "stalling",
                "Stalling Mock",
                "1.0-mock",
                "Blocks for a fixed time before answering (MOCK)",
            ),
            delay,
            label: label.to_string(),
        }
    }
}

impl EmotionClassifier for StallingClassifier {
    fn info(&self) -> &ClassifierInfo {
        &self.info
    }

    fn classify(
        &self,
        _image: &RgbImage,
        _params: &ClassifierParams,
    ) -> Result<Classification, ClassifierError> {
        std::thread::sleep(self.delay);
        Ok(Classification::new(self.label.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_luminance_is_deterministic() {
        let classifier = LuminanceClassifier::new();
        let params = ClassifierParams::default();
        let bright = RgbImage::from_pixel(8, 8, Rgb([250, 250, 250]));
        let dark = RgbImage::from_pixel(8, 8, Rgb([5, 5, 5]));

        let a = classifier.classify(&bright, &params).unwrap();
        let b = classifier.classify(&bright, &params).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dominant.as_str(), "happy");
        assert_eq!(a.scores.len(), LUMA_BUCKETS.len());

        let c = classifier.classify(&dark, &params).unwrap();
        assert_eq!(c.dominant.as_str(), "fear");
    }

    #[test]
    fn test_luminance_strict_detection_rejects_flat_frames() {
        let classifier = LuminanceClassifier::new();
        let flat = RgbImage::from_pixel(8, 8, Rgb([128, 128, 128]));

        let strict = ClassifierParams::default().with_param("enforce_face_detection", true);
        assert_eq!(
            classifier.classify(&flat, &strict),
            Err(ClassifierError::NoFace)
        );
        assert!(classifier
            .classify(&flat, &ClassifierParams::default())
            .is_ok());
    }

    #[test]
    fn test_scripted_cycles() {
        let classifier = ScriptedClassifier::new(["happy", "sad"]);
        let img = RgbImage::new(1, 1);
        let params = ClassifierParams::default();
        let labels: Vec<String> = (0..3)
            .map(|_| classifier.classify(&img, &params).unwrap().dominant.to_string())
            .collect();
        assert_eq!(labels, vec!["happy", "sad", "happy"]);
        assert_eq!(classifier.calls(), 3);
    }
}
