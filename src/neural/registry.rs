//! Classifier registry
//!
//! Maps classifier IDs to backends so configuration and the CLI can pick
//! one by name.

use std::collections::HashMap;
use std::sync::Arc;

use super::mock::{FailingClassifier, LuminanceClassifier, ScriptedClassifier};
use super::model::{ClassifierInfo, EmotionClassifier, KNOWN_LABELS};
use crate::error::{EmotiveError, Result};

/// Classifier used when none is configured
pub const DEFAULT_CLASSIFIER: &str = "luminance";

/// Registry of available classifiers
pub struct ClassifierRegistry {
    classifiers: HashMap<String, Arc<dyn EmotionClassifier>>,
}

impl ClassifierRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            classifiers: HashMap::new(),
        }
    }

    /// Create registry with the built-in mock backends
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LuminanceClassifier::new()));
        registry.register(Arc::new(ScriptedClassifier::new(KNOWN_LABELS.iter().copied())));
        registry.register(Arc::new(FailingClassifier::default()));
        registry
    }

    /// Register a classifier, replacing any previous one with the same ID
    pub fn register(&mut self, classifier: Arc<dyn EmotionClassifier>) {
        self.classifiers
            .insert(classifier.id().to_string(), classifier);
    }

    /// Get a classifier by ID
    pub fn get(&self, id: &str) -> Result<Arc<dyn EmotionClassifier>> {
        self.classifiers
            .get(id)
            .cloned()
            .ok_or_else(|| EmotiveError::UnknownClassifier { id: id.to_string() })
    }

    pub fn has_classifier(&self, id: &str) -> bool {
        self.classifiers.contains_key(id)
    }

    /// Registered classifier info, sorted by ID
    pub fn list(&self) -> Vec<&ClassifierInfo> {
        let mut infos: Vec<&ClassifierInfo> = self.classifiers.values().map(|c| c.info()).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }
}

impl Default for ClassifierRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
