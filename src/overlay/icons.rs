//! Label icons
//!
//! Icons are decoded and resized once, at setup. A missing or unreadable
//! asset is not fatal: the label simply renders without an icon.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use image::imageops::{self, FilterType};
use image::RgbaImage;
use log::{info, warn};

use crate::error::{EmotiveError, Result};
use crate::neural::EmotionLabel;

/// Default icon edge length in pixels
pub const DEFAULT_ICON_SIZE: u32 = 64;

/// Fixed-size RGBA icons keyed by label
#[derive(Debug, Clone)]
pub struct IconSet {
    size: u32,
    icons: HashMap<String, RgbaImage>,
    /// Labels whose asset failed to load
    missing: Vec<String>,
}

impl IconSet {
    /// A set with no icons; the overlay draws text only
    pub fn empty(size: u32) -> Self {
        Self {
            size,
            icons: HashMap::new(),
            missing: Vec::new(),
        }
    }

    /// Load every icon in `mapping`, resized to `size`×`size`
    ///
    /// # Errors
    /// `InvalidConfig` for a zero size. Individual assets that fail to load
    /// are logged and listed in [`IconSet::missing`].
    pub fn load(mapping: &BTreeMap<String, PathBuf>, size: u32) -> Result<Self> {
        if size == 0 {
            return Err(EmotiveError::config("overlay.icon_size", "icon size must be positive"));
        }

        let mut set = Self::empty(size);
        for (label, path) in mapping {
            let loaded = image::open(path).map_err(|e| EmotiveError::IconLoad {
                label: label.clone(),
                path: path.clone(),
                reason: e.to_string(),
            });
            match loaded {
                Ok(img) => set.insert(label, img.to_rgba8()),
                Err(e) => {
                    warn!("[ICONS] {}", e);
                    set.missing.push(label.clone());
                }
            }
        }
        info!(
            "[ICONS] loaded {} icon(s), {} missing",
            set.icons.len(),
            set.missing.len()
        );
        Ok(set)
    }

    /// Add an icon, resizing it to the set's size
    pub fn insert(&mut self, label: &str, icon: RgbaImage) {
        let icon = if icon.dimensions() == (self.size, self.size) {
            icon
        } else {
            imageops::resize(&icon, self.size, self.size, FilterType::Triangle)
        };
        self.icons.insert(label.to_string(), icon);
    }

    pub fn get(&self, label: &EmotionLabel) -> Option<&RgbaImage> {
        self.icons.get(label.as_str())
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    pub fn missing(&self) -> &[String] {
        &self.missing
    }
}
