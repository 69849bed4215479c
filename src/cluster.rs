//! K-means grouping of all cleaned colors in Lab space.

use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;

use kmeans_colors::get_kmeans;
use palette::Lab;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::color::{Rgb, rgb_label};
use crate::config::ClusterConfig;
use crate::error::{PaletteError, Result};
use crate::labeling::{ClusterStats, LabelPolicy, population_order};
use crate::model::{ClusteredColor, ColorCluster, RankedColor};

/// Best k-means run over a feature set.
#[derive(Debug, Clone)]
pub struct ClusterFit {
    /// Cluster index of every feature row
    pub assignments: Vec<usize>,
    pub centroids: Vec<Lab>,
    /// Sum of squared distances to the assigned centroids
    pub inertia: f32,
    /// Seed of the winning restart
    pub seed: u64,
}

/// Clustered rows plus the cluster table, most populous cluster first.
#[derive(Debug, Clone)]
pub struct Clustering {
    pub colors: Vec<ClusteredColor>,
    pub clusters: Vec<ColorCluster>,
}

/// One point of the elbow curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InertiaPoint {
    pub k: usize,
    pub inertia: f32,
}

fn lab_of(triple: [f32; 3]) -> Lab {
    Lab::new(triple[0], triple[1], triple[2])
}

fn distinct_count(features: &[Lab]) -> usize {
    features
        .iter()
        .map(|lab| [lab.l.to_bits(), lab.a.to_bits(), lab.b.to_bits()])
        .collect::<HashSet<_>>()
        .len()
}

fn squared_distance(a: &Lab, b: &Lab) -> f32 {
    (a.l - b.l).powi(2) + (a.a - b.a).powi(2) + (a.b - b.b).powi(2)
}

/// Sum of squared distances of every feature to its centroid.
pub fn inertia(features: &[Lab], centroids: &[Lab], assignments: &[usize]) -> f32 {
    features
        .iter()
        .zip(assignments)
        .map(|(f, &c)| squared_distance(f, &centroids[c]))
        .sum()
}

/// Z-score every Lab dimension. Constant dimensions are only centred.
pub fn standardize(features: &[Lab]) -> Vec<Lab> {
    if features.is_empty() {
        return Vec::new();
    }
    let n = features.len() as f32;
    let dims = |lab: &Lab| [lab.l, lab.a, lab.b];

    let mut mean = [0.0f32; 3];
    for f in features {
        for (m, v) in mean.iter_mut().zip(dims(f)) {
            *m += v / n;
        }
    }
    let mut variance = [0.0f32; 3];
    for f in features {
        for ((s, m), v) in variance.iter_mut().zip(mean).zip(dims(f)) {
            *s += (v - m).powi(2) / n;
        }
    }
    let scale = variance.map(|var| if var > 0.0 { var.sqrt() } else { 1.0 });

    features
        .iter()
        .map(|f| {
            let [l, a, b] = dims(f);
            Lab::new(
                (l - mean[0]) / scale[0],
                (a - mean[1]) / scale[1],
                (b - mean[2]) / scale[2],
            )
        })
        .collect()
}

/// Run k-means `restarts` times and keep the run with the lowest inertia.
///
/// Fails when `k` is outside `1..=255` or exceeds the number of distinct
/// feature rows; `k` is never reduced silently.
pub fn fit(features: &[Lab], k: usize, config: &ClusterConfig) -> Result<ClusterFit> {
    trace!(rows = features.len(), k, restarts = config.restarts, "cluster::fit");

    if k == 0 || k > u8::MAX as usize {
        return Err(PaletteError::invalid_config("clustering.k", format!("{k} is outside 1..=255")));
    }
    let distinct = distinct_count(features);
    if k > distinct {
        return Err(PaletteError::TooFewColors { k, distinct });
    }

    let mut best: Option<ClusterFit> = None;
    for restart in 0..config.restarts.max(1) {
        let seed = config.seed.wrapping_add(restart as u64);
        let run = get_kmeans(k, config.max_iterations, config.convergence, false, features, seed);
        let assignments: Vec<usize> = run.indices.iter().map(|&i| i as usize).collect();
        let score = inertia(features, &run.centroids, &assignments);
        debug!(seed, inertia = score, "k-means restart");

        if best.as_ref().is_none_or(|b| score < b.inertia) {
            best = Some(ClusterFit {
                assignments,
                centroids: run.centroids,
                inertia: score,
                seed,
            });
        }
    }

    best.ok_or_else(|| PaletteError::invalid_config("clustering.restarts", "must be at least 1"))
}

/// Inertia of the best fit for every `k` in `ks`, for choosing the cluster count.
///
/// Values of `k` above the number of distinct colors are skipped.
pub fn inertia_curve(
    features: &[Lab],
    ks: RangeInclusive<usize>,
    config: &ClusterConfig,
) -> Result<Vec<InertiaPoint>> {
    let distinct = distinct_count(features);
    let mut curve = Vec::new();
    for k in ks {
        if k == 0 || k > distinct {
            debug!(k, distinct, "skipping k");
            continue;
        }
        let fit = fit(features, k, config)?;
        curve.push(InertiaPoint { k, inertia: fit.inertia });
    }
    Ok(curve)
}

/// Per-channel median of `colors`; an even count averages the middle pair.
pub fn median_rgb(colors: &[Rgb]) -> Rgb {
    let mut out = [0u8; 3];
    if colors.is_empty() {
        return out;
    }
    for (channel, slot) in out.iter_mut().enumerate() {
        let mut values: Vec<u16> = colors.iter().map(|c| c[channel] as u16).collect();
        values.sort_unstable();
        let mid = values.len() / 2;
        *slot = if values.len() % 2 == 1 {
            values[mid] as u8
        } else {
            ((values[mid - 1] + values[mid]) / 2) as u8
        };
    }
    out
}

/// Cluster ranked colors and name the clusters with `policy`.
pub fn cluster_colors(
    ranked: &[RankedColor],
    config: &ClusterConfig,
    policy: &dyn LabelPolicy,
) -> Result<Clustering> {
    trace!(rows = ranked.len(), k = config.k, "cluster::cluster_colors");

    if let Some(capacity) = policy.capacity() {
        if capacity < config.k {
            return Err(PaletteError::invalid_config(
                "cluster_names",
                format!("{capacity} names for {} clusters", config.k),
            ));
        }
    }

    let raw: Vec<Lab> = ranked.iter().map(|r| lab_of(r.lab)).collect();
    let features = if config.standardize { standardize(&raw) } else { raw };
    let fit = fit(&features, config.k, config)?;

    let mut members: HashMap<usize, Vec<&RankedColor>> = HashMap::new();
    for (row, &cluster) in ranked.iter().zip(&fit.assignments) {
        members.entry(cluster).or_default().push(row);
    }

    let mut stats: Vec<ClusterStats> = Vec::with_capacity(config.k);
    for cluster_id in 0..config.k {
        let Some(rows) = members.get(&cluster_id) else {
            warn!(cluster_id, "k-means left a cluster empty");
            continue;
        };
        let rgbs: Vec<Rgb> = rows.iter().map(|r| r.rgb).collect();
        let parties: HashSet<&str> = rows.iter().map(|r| r.party.as_str()).collect();
        stats.push(ClusterStats {
            cluster_id,
            representative: median_rgb(&rgbs),
            total_colors: rows.len(),
            parties: parties.len(),
            importance: rows.iter().map(|r| r.color_importance).sum(),
        });
    }

    let names = policy.label(&stats)?;
    let mut named: Vec<(ClusterStats, String)> = stats.into_iter().zip(names).collect();
    named.sort_by(|(a, _), (b, _)| population_order(a, b));

    let clusters: Vec<ColorCluster> = named
        .into_iter()
        .map(|(s, name)| ColorCluster {
            cluster_id: s.cluster_id,
            name,
            representative: s.representative,
            total_colors: s.total_colors,
            parties: s.parties,
            importance: s.importance,
        })
        .collect();

    let by_id: HashMap<usize, &ColorCluster> = clusters.iter().map(|c| (c.cluster_id, c)).collect();
    let colors: Vec<ClusteredColor> = ranked
        .iter()
        .zip(&fit.assignments)
        .map(|(row, cluster_id)| {
            let cluster = by_id[cluster_id];
            ClusteredColor {
                party: row.party.clone(),
                key: row.key.clone(),
                rank: row.rank,
                rgb: row.rgb,
                hsl: row.hsl,
                lab: row.lab,
                color_importance: row.color_importance,
                cumulative_importance: row.cumulative_importance,
                color_label: cluster_id.to_string(),
                color_cluster: cluster.name.clone(),
                group_color_repr: rgb_label(cluster.representative),
                actual_color: rgb_label(row.rgb),
                hue: row.hsl[0],
                sat: row.hsl[1],
                lum: row.hsl[2],
            }
        })
        .collect();

    info!(
        rows = colors.len(),
        clusters = clusters.len(),
        inertia = fit.inertia,
        seed = fit.seed,
        "clustering done"
    );
    Ok(Clustering { colors, clusters })
}
