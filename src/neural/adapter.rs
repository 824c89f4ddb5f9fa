//! Defensive classifier invocation
//!
//! Every way a classifier call can go wrong ends here as an
//! [`InferenceOutcome`]. Nothing in this module touches session state: the
//! caller commits a `Success` and ignores everything else, so a failed call
//! can never leave a half-made observation behind.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, error, warn};
use tokio::sync::Semaphore;

use super::model::{Classification, ClassifierParams, EmotionClassifier};
use crate::engine::Frame;
use crate::error::{EmotiveError, Result};

/// Why a sampled frame produced no observation
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The classifier returned an error
    Classifier(String),
    /// The classifier returned a blank label
    InvalidOutput,
    /// The call did not finish within the timeout
    Timeout(Duration),
    /// Too many calls already in flight
    Busy,
    /// The classifier panicked on the blocking pool
    Panicked(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Classifier(e) => write!(f, "classifier error: {}", e),
            SkipReason::InvalidOutput => write!(f, "classifier returned a blank label"),
            SkipReason::Timeout(d) => write!(f, "timed out after {} ms", d.as_millis()),
            SkipReason::Busy => write!(f, "classifier busy"),
            SkipReason::Panicked(e) => write!(f, "classifier panicked: {}", e),
        }
    }
}

/// Outcome of one inference attempt
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutcome {
    /// Record this classification
    Success(Classification),
    /// Drop this frame, keep going
    Skipped(SkipReason),
    /// Stop sampling; the classifier will not recover
    Fatal(String),
}

impl InferenceOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InferenceOutcome::Success(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, InferenceOutcome::Fatal(_))
    }
}

/// Knobs bounding the cost of one inference call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdapterSettings {
    /// Square input resolution; `None` sends the native frame
    pub input_size: Option<u32>,
    /// Per-call timeout
    pub timeout: Duration,
    /// Maximum concurrently running classifier calls, abandoned ones included
    pub max_in_flight: usize,
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            input_size: Some(224),
            timeout: Duration::from_secs(2),
            max_in_flight: 2,
        }
    }
}

/// Wraps a classifier so that no failure escapes
pub struct InferenceAdapter {
    classifier: Arc<dyn EmotionClassifier>,
    params: Arc<ClassifierParams>,
    settings: AdapterSettings,
    permits: Arc<Semaphore>,
}

impl InferenceAdapter {
    /// # Errors
    /// `InvalidConfig` for a zero input size, zero timeout or zero in-flight
    /// bound.
    pub fn new(
        classifier: Arc<dyn EmotionClassifier>,
        params: ClassifierParams,
        settings: AdapterSettings,
    ) -> Result<Self> {
        if settings.input_size == Some(0) {
            return Err(EmotiveError::config(
                "inference.input_size",
                "input size must be positive",
            ));
        }
        if settings.timeout.is_zero() {
            return Err(EmotiveError::config(
                "inference.timeout_ms",
                "timeout must be positive",
            ));
        }
        if settings.max_in_flight == 0 {
            return Err(EmotiveError::config(
                "inference.max_in_flight",
                "at least one call must be allowed",
            ));
        }
        Ok(Self {
            classifier,
            params: Arc::new(params),
            settings,
            permits: Arc::new(Semaphore::new(settings.max_in_flight)),
        })
    }

    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    pub fn classifier_id(&self) -> &str {
        self.classifier.id()
    }

    /// Classify one frame
    ///
    /// Must be called from within a tokio runtime. The classifier runs on
    /// the blocking pool; on timeout the call is abandoned and its permit is
    /// released only when the classifier actually returns.
    pub async fn infer(&self, frame: &Frame) -> InferenceOutcome {
        if !self.classifier.is_available() {
            error!("[INFER] classifier '{}' unavailable", self.classifier.id());
            return InferenceOutcome::Fatal(format!(
                "classifier '{}' unavailable",
                self.classifier.id()
            ));
        }

        let permit = match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                debug!("[INFER] frame {} skipped: busy", frame.sequence());
                return InferenceOutcome::Skipped(SkipReason::Busy);
            }
        };

        let input = frame.downsample(self.settings.input_size);
        let classifier = Arc::clone(&self.classifier);
        let params = Arc::clone(&self.params);
        let started = Instant::now();

        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            classifier.classify(&input, &params)
        });

        let outcome = match tokio::time::timeout(self.settings.timeout, task).await {
            Err(_) => InferenceOutcome::Skipped(SkipReason::Timeout(self.settings.timeout)),
            Ok(Err(join)) => InferenceOutcome::Skipped(SkipReason::Panicked(join.to_string())),
            Ok(Ok(Err(e))) if e.is_fatal() => InferenceOutcome::Fatal(e.to_string()),
            Ok(Ok(Err(e))) => InferenceOutcome::Skipped(SkipReason::Classifier(e.to_string())),
            Ok(Ok(Ok(c))) if c.dominant.is_blank() => {
                InferenceOutcome::Skipped(SkipReason::InvalidOutput)
            }
            Ok(Ok(Ok(c))) => InferenceOutcome::Success(c),
        };

        match &outcome {
            InferenceOutcome::Success(c) => debug!(
                "[INFER] frame {} -> {} in {} ms",
                frame.sequence(),
                c.dominant,
                started.elapsed().as_millis()
            ),
            InferenceOutcome::Skipped(reason) => {
                warn!("[INFER] frame {} skipped: {}", frame.sequence(), reason)
            }
            InferenceOutcome::Fatal(reason) => {
                error!("[INFER] frame {} fatal: {}", frame.sequence(), reason)
            }
        }
        outcome
    }
}
