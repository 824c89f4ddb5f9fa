//! Current label register
//!
//! Holds the most recent successfully classified label for one stream. The
//! render path reads it for every frame; only committed inference results
//! replace it.

use parking_lot::RwLock;

use crate::neural::EmotionLabel;

#[derive(Debug, Default)]
pub struct CurrentLabel {
    label: RwLock<EmotionLabel>,
}

impl CurrentLabel {
    /// Starts at `"neutral"`
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> EmotionLabel {
        self.label.read().clone()
    }

    /// Replace the label, returning the previous one
    pub fn replace(&self, label: EmotionLabel) -> EmotionLabel {
        std::mem::replace(&mut *self.label.write(), label)
    }
}
