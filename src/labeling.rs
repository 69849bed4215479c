//! Naming of color clusters.
//!
//! K-means ids carry no meaning and may change with the seed, so names are
//! attached after clustering by a [`LabelPolicy`]. The shipped policy hands out
//! a fixed list of names by cluster population. That list was tuned by eye for
//! the party-logo dataset at `k = 5` and does not carry over to other data.

use std::cmp::Ordering;

use tracing::warn;

use crate::color::{Rgb, to_lab};
use crate::error::{PaletteError, Result};

/// What a policy may look at when naming a cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterStats {
    pub cluster_id: usize,
    pub representative: Rgb,
    pub total_colors: usize,
    pub parties: usize,
    pub importance: f64,
}

/// Assigns a display name to every cluster.
pub trait LabelPolicy {
    /// Largest number of clusters this policy can name, if bounded.
    fn capacity(&self) -> Option<usize>;

    /// Names for `clusters`, in the same order as the input.
    fn label(&self, clusters: &[ClusterStats]) -> Result<Vec<String>>;
}

/// Names clusters from a fixed list in [`population_order`]. Equal member
/// counts are logged as a warning.
#[derive(Debug, Clone)]
pub struct PopulationRankLabels {
    names: Vec<String>,
}

impl PopulationRankLabels {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

/// Population order of clusters: more members first, then larger total
/// importance, then lighter representative, then representative RGB.
pub fn population_order(a: &ClusterStats, b: &ClusterStats) -> Ordering {
    b.total_colors
        .cmp(&a.total_colors)
        .then_with(|| b.importance.total_cmp(&a.importance))
        .then_with(|| to_lab(b.representative).l.total_cmp(&to_lab(a.representative).l))
        .then_with(|| a.representative.cmp(&b.representative))
}

impl LabelPolicy for PopulationRankLabels {
    fn capacity(&self) -> Option<usize> {
        Some(self.names.len())
    }

    fn label(&self, clusters: &[ClusterStats]) -> Result<Vec<String>> {
        if clusters.len() > self.names.len() {
            return Err(PaletteError::invalid_config(
                "cluster_names",
                format!("{} names for {} clusters", self.names.len(), clusters.len()),
            ));
        }

        let mut by_rank: Vec<usize> = (0..clusters.len()).collect();
        by_rank.sort_by(|&a, &b| population_order(&clusters[a], &clusters[b]));

        for pair in by_rank.windows(2) {
            let (first, second) = (&clusters[pair[0]], &clusters[pair[1]]);
            if first.total_colors == second.total_colors {
                warn!(
                    first = first.cluster_id,
                    second = second.cluster_id,
                    members = first.total_colors,
                    "clusters tie in size, naming by importance and lightness"
                );
            }
        }

        let mut names = vec![String::new(); clusters.len()];
        for (position, &idx) in by_rank.iter().enumerate() {
            names[idx] = self.names[position].clone();
        }
        Ok(names)
    }
}
