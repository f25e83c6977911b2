use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::hiding::backface::{DEFAULT_SIMILARITY_THRESHOLD, ReferenceStrategy};

/// Hiding settings that persist to disk
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HideSettings {
    /// Cosine similarity to the toward-viewer direction a face needs to stay
    /// visible when hiding backfaces. Calibration constant, clamped to [-1, 1].
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    /// How the toward-viewer reference normal is obtained
    #[serde(default)]
    pub reference: ReferenceStrategy,
}

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

impl Default for HideSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            reference: ReferenceStrategy::default(),
        }
    }
}

impl HideSettings {
    /// Get the settings file path
    fn file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("bevy_backface_hiding");
            p.push("settings.ron");
            p
        })
    }

    /// Parse settings from RON, clamping out-of-range values
    pub fn from_ron_str(content: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str::<Self>(content).map(Self::sanitized)
    }

    /// Serialize settings as pretty RON
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::file_path() else {
            return Self::default();
        };

        match fs::read_to_string(&path) {
            Ok(content) => Self::from_ron_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring invalid settings in {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save settings to disk
    pub fn save(&self) {
        let Some(path) = Self::file_path() else {
            error!("Could not determine config directory");
            return;
        };

        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory: {}", e);
                return;
            }
        }

        match self.to_ron_string() {
            Ok(content) => {
                if let Err(e) = fs::write(&path, content) {
                    error!("Failed to save settings: {}", e);
                } else {
                    info!("Settings saved to: {:?}", path);
                }
            }
            Err(e) => {
                error!("Failed to serialize settings: {}", e);
            }
        }
    }

    fn sanitized(mut self) -> Self {
        if !self.similarity_threshold.is_finite() {
            warn!(
                "Similarity threshold {} is not a number, using {}",
                self.similarity_threshold, DEFAULT_SIMILARITY_THRESHOLD
            );
            self.similarity_threshold = DEFAULT_SIMILARITY_THRESHOLD;
        }
        self.similarity_threshold = self.similarity_threshold.clamp(-1.0, 1.0);
        self
    }
}
