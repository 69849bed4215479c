//! Tunable parameters for every pipeline stage.
//!
//! The defaults reproduce the reference analysis of the party-logo dataset:
//! a `(220,220,220)` fill, ten colors per logo, a `[210,220]` brightness band
//! with a std ceiling of 10, and five clusters named by population.
//!
//! ```no_run
//! use party_colors::PipelineConfig;
//! use std::path::Path;
//!
//! let config = PipelineConfig::from_json_file(Path::new("pipeline.json"))?;
//! config.validate()?;
//! # Ok::<(), party_colors::PaletteError>(())
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::{PaletteError, Result};

/// Fill color logos are flattened onto before extraction.
pub const DEFAULT_FILL: Rgb = [220, 220, 220];

/// Cluster names handed out by population rank for the party-logo dataset.
pub const DEFAULT_CLUSTER_NAMES: [&str; 5] = ["Light", "Dark", "Yellow", "Red", "Green"];

/// Complete configuration of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub extraction: ExtractionConfig,
    pub background: BackgroundConfig,
    pub clustering: ClusterConfig,
    /// Names assigned to clusters, most populous first
    pub cluster_names: ClusterNames,
}

/// Dominant-color extraction from logo images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Number of dominant colors kept per logo
    pub n_colors: usize,
    /// Color transparent regions are composited onto
    pub fill_color: Rgb,
    /// Longest side the flattened logo is resized to before clustering
    pub downscale: Option<u32>,
    pub max_iterations: usize,
    pub convergence: f32,
    pub seed: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            n_colors: 10,
            fill_color: DEFAULT_FILL,
            downscale: Some(256),
            max_iterations: 20,
            convergence: 1e-4,
            seed: 0,
        }
    }
}

/// Brightness band used to recognise the normalisation fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Channel means are floored to a multiple of this step
    pub brightness_step: u32,
    /// Lower bound of the background brightness band (inclusive)
    pub brightness_min: u32,
    /// Upper bound of the background brightness band (inclusive)
    pub brightness_max: u32,
    /// Largest channel standard deviation still considered gray
    pub max_std: u32,
    /// Abort the run when a party loses every color to the filter.
    /// When false the party is dropped with a warning.
    pub abort_on_empty_party: bool,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            brightness_step: 10,
            brightness_min: 210,
            brightness_max: 220,
            max_std: 10,
            abort_on_empty_party: true,
        }
    }
}

/// K-means over Lab coordinates of the cleaned colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub k: usize,
    /// Independent k-means runs; the lowest score wins
    pub restarts: usize,
    pub max_iterations: usize,
    pub convergence: f32,
    pub seed: u64,
    /// Z-score each Lab dimension before clustering
    pub standardize: bool,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            k: 5,
            restarts: 10,
            max_iterations: 300,
            convergence: 1e-4,
            seed: 0,
            standardize: false,
        }
    }
}

/// Ordered list of cluster names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterNames(pub Vec<String>);

impl Default for ClusterNames {
    fn default() -> Self {
        Self(DEFAULT_CLUSTER_NAMES.iter().map(|s| s.to_string()).collect())
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| PaletteError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| PaletteError::json(path, e))
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).map_err(|e| PaletteError::json(path, e))?;
        fs::write(path, text).map_err(|e| PaletteError::io(path, e))
    }

    /// Reject values no stage can work with.
    pub fn validate(&self) -> Result<()> {
        let ex = &self.extraction;
        if ex.n_colors == 0 || ex.n_colors > 256 {
            return Err(PaletteError::invalid_config(
                "extraction.n_colors",
                format!("{} is outside 1..=256", ex.n_colors),
            ));
        }
        if ex.downscale == Some(0) {
            return Err(PaletteError::invalid_config("extraction.downscale", "must be positive"));
        }

        let bg = &self.background;
        if bg.brightness_step == 0 {
            return Err(PaletteError::invalid_config("background.brightness_step", "must be positive"));
        }
        if bg.brightness_min > bg.brightness_max {
            return Err(PaletteError::invalid_config(
                "background.brightness_min",
                format!("{} exceeds brightness_max {}", bg.brightness_min, bg.brightness_max),
            ));
        }

        let cl = &self.clustering;
        if cl.k == 0 || cl.k > 255 {
            return Err(PaletteError::invalid_config(
                "clustering.k",
                format!("{} is outside 1..=255", cl.k),
            ));
        }
        if cl.restarts == 0 {
            return Err(PaletteError::invalid_config("clustering.restarts", "must be at least 1"));
        }
        if self.cluster_names.0.len() < cl.k {
            return Err(PaletteError::invalid_config(
                "cluster_names",
                format!("{} names for {} clusters", self.cluster_names.0.len(), cl.k),
            ));
        }
        Ok(())
    }
}
