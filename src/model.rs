//! Typed rows exchanged between stages.

use serde::{Deserialize, Serialize};

use crate::color::{Rgb, triple};

/// One dominant color of one logo, as extracted (`colors_with_background.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedColor {
    pub party: String,
    #[serde(with = "triple")]
    pub rgb: Rgb,
    #[serde(with = "triple")]
    pub hsl: [f32; 3],
    /// Fraction of the logo area covered by this color
    pub proportion: f64,
}

/// Extracted color with its background verdict (`colors_classified.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedColor {
    pub party: String,
    #[serde(with = "triple")]
    pub rgb: Rgb,
    #[serde(with = "triple")]
    pub hsl: [f32; 3],
    #[serde(with = "triple")]
    pub lab: [f32; 3],
    pub proportion: f64,
    pub brightness_mean: u32,
    pub brightness_std: u32,
    pub is_background: bool,
}

/// Foreground color with its share of the visible logo area (`colors_cleaned.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedColor {
    pub party: String,
    #[serde(with = "triple")]
    pub rgb: Rgb,
    #[serde(with = "triple")]
    pub hsl: [f32; 3],
    #[serde(with = "triple")]
    pub lab: [f32; 3],
    /// `proportion / total_area`; sums to 1 per party
    pub color_importance: f64,
}

/// Cleaned color ranked within its party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedColor {
    pub party: String,
    /// `"{party}-{rank}"`
    pub key: String,
    pub rank: usize,
    #[serde(with = "triple")]
    pub rgb: Rgb,
    #[serde(with = "triple")]
    pub hsl: [f32; 3],
    #[serde(with = "triple")]
    pub lab: [f32; 3],
    pub color_importance: f64,
    pub cumulative_importance: f64,
}

/// Ranked color with its cluster assignment (`party_colors_infos.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteredColor {
    pub party: String,
    pub key: String,
    pub rank: usize,
    #[serde(with = "triple")]
    pub rgb: Rgb,
    #[serde(with = "triple")]
    pub hsl: [f32; 3],
    #[serde(with = "triple")]
    pub lab: [f32; 3],
    pub color_importance: f64,
    pub cumulative_importance: f64,
    /// Cluster id as assigned by k-means
    pub color_label: String,
    /// Human-readable cluster name
    pub color_cluster: String,
    /// Legend swatch of the cluster, `RGB(r,g,b)`
    pub group_color_repr: String,
    /// Legend swatch of this color, `RGB(r,g,b)`
    pub actual_color: String,
    pub hue: f32,
    pub sat: f32,
    pub lum: f32,
}

/// Summary of one color cluster (`color_clusters.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorCluster {
    pub cluster_id: usize,
    pub name: String,
    /// Per-channel median RGB of the members
    #[serde(with = "triple")]
    pub representative: Rgb,
    pub total_colors: usize,
    /// Distinct parties with at least one member color
    pub parties: usize,
    /// Summed color importance of the members
    pub importance: f64,
}
