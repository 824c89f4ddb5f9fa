//! Pipeline configuration
//!
//! Everything tunable about a pipeline lives in [`PipelineConfig`]. It is
//! plain serde data, loadable from a JSON file, and is validated as a whole
//! before any pipeline component is built so bad values fail at setup
//! rather than on the frame path.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::SamplingPolicy;
use crate::error::{EmotiveError, Result};
use crate::export::ExportOptions;
use crate::neural::{AdapterSettings, ClassifierParams, DEFAULT_CLASSIFIER};
use crate::overlay::OverlayStyle;

/// Inference settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Registry ID of the classifier backend
    pub classifier: String,
    /// Square classifier input size; `null` sends frames at native size
    pub input_size: Option<u32>,
    pub timeout_ms: u64,
    pub max_in_flight: usize,
    /// Passed through to the classifier untouched
    pub params: ClassifierParams,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        let settings = AdapterSettings::default();
        Self {
            classifier: DEFAULT_CLASSIFIER.to_string(),
            input_size: settings.input_size,
            timeout_ms: settings.timeout.as_millis() as u64,
            max_in_flight: settings.max_in_flight,
            params: ClassifierParams::default(),
        }
    }
}

impl InferenceConfig {
    pub fn adapter_settings(&self) -> AdapterSettings {
        AdapterSettings {
            input_size: self.input_size,
            timeout: Duration::from_millis(self.timeout_ms),
            max_in_flight: self.max_in_flight,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.classifier.trim().is_empty() {
            return Err(EmotiveError::config("inference.classifier", "must not be empty"));
        }
        if self.input_size == Some(0) {
            return Err(EmotiveError::config("inference.input_size", "must be positive"));
        }
        if self.timeout_ms == 0 {
            return Err(EmotiveError::config("inference.timeout_ms", "must be positive"));
        }
        if self.max_in_flight == 0 {
            return Err(EmotiveError::config("inference.max_in_flight", "must be at least 1"));
        }
        Ok(())
    }
}

/// Where inference runs relative to the frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Classify inside `process_frame`
    #[default]
    Inline,
    /// Hand sampled frames to a worker pool behind a bounded queue
    Pooled { workers: usize, queue_depth: usize },
}

impl ExecutionMode {
    fn validate(&self) -> Result<()> {
        if let ExecutionMode::Pooled {
            workers,
            queue_depth,
        } = *self
        {
            if workers == 0 {
                return Err(EmotiveError::config("mode.workers", "must be at least 1"));
            }
            if queue_depth == 0 {
                return Err(EmotiveError::config("mode.queue_depth", "must be at least 1"));
            }
        }
        Ok(())
    }
}

/// Overlay placement plus the label→icon mapping
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    #[serde(flatten)]
    pub style: OverlayStyle,
    /// Icon file per label
    pub icons: BTreeMap<String, PathBuf>,
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub sampling: SamplingPolicy,
    pub inference: InferenceConfig,
    pub mode: ExecutionMode,
    pub overlay: OverlayConfig,
    pub export: ExportOptions,
}

impl PipelineConfig {
    /// Load and validate a JSON config file
    ///
    /// Keys left out of the file keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| EmotiveError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section, stopping at the first bad value
    pub fn validate(&self) -> Result<()> {
        self.sampling.validate()?;
        self.inference.validate()?;
        self.mode.validate()?;
        self.overlay.style.validate()?;
        self.export.validate()?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
