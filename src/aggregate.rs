//! Cross-party summaries of the clustered colors.
//!
//! Everything here is pure aggregation feeding the charts: cluster presence
//! across parties, per-party share of each cluster and a hue ordering of all
//! colors.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

use crate::model::ClusteredColor;

/// Party metadata row (`partidos_infos.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyInfo {
    pub code: String,
    /// Date string ending in a four-digit year, e.g. `10/02/1980`
    #[serde(default)]
    pub creation_date: String,
    #[serde(default)]
    pub electoral_num: Option<i64>,
}

impl PartyInfo {
    /// Creation year taken from the last four characters of the date.
    pub fn year(&self) -> Option<i32> {
        let date = self.creation_date.trim();
        let start = date.len().checked_sub(4)?;
        date.get(start..)?.parse().ok()
    }

    /// Electoral number rounded down to its ten, e.g. 45 -> 40.
    pub fn number_bucket(&self) -> Option<i64> {
        self.electoral_num.map(|n| 10 * n.div_euclid(10))
    }
}

/// Clustered color joined with its party's metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedColor {
    #[serde(flatten)]
    pub color: ClusteredColor,
    pub year: Option<i32>,
    pub electoral_num: Option<i64>,
    pub number_bucket: Option<i64>,
}

/// Share of parties using a cluster (`cluster_presence.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterPresence {
    pub cluster_label: String,
    pub cluster_name: String,
    /// Legend swatch of the cluster
    pub swatch: String,
    pub parties: usize,
    pub total_parties: usize,
    /// `100 * parties / total_parties`
    pub presence: f64,
    pub importance: f64,
}

/// Importance of one cluster within one party (`party_cluster_shares.csv`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyClusterShare {
    pub party: String,
    pub cluster_label: String,
    pub cluster_name: String,
    pub importance: f64,
    /// `100 * importance`
    pub predominance: f64,
}

/// Position of a color on the hue strip of all colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HueOrderedColor {
    pub position: usize,
    pub key: String,
    pub party: String,
    pub cluster_name: String,
    pub actual_color: String,
    pub hue: f32,
    pub sat: f32,
    pub lum: f32,
}

/// Everything the charts need, written as `report.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub total_parties: usize,
    pub parties_without_metadata: Vec<String>,
    pub presence: Vec<ClusterPresence>,
    pub shares: Vec<PartyClusterShare>,
    pub hue_order: Vec<HueOrderedColor>,
    pub colors: Vec<EnrichedColor>,
}

/// Left-join colors with party metadata on `party == code`.
///
/// Returns the joined rows and the parties with no metadata row.
pub fn join_metadata(colors: &[ClusteredColor], parties: &[PartyInfo]) -> (Vec<EnrichedColor>, Vec<String>) {
    let by_code: HashMap<&str, &PartyInfo> = parties.iter().map(|p| (p.code.as_str(), p)).collect();
    let mut missing: Vec<String> = Vec::new();

    let joined = colors
        .iter()
        .map(|color| {
            let info = by_code.get(color.party.as_str());
            if info.is_none() && !missing.contains(&color.party) {
                missing.push(color.party.clone());
            }
            EnrichedColor {
                color: color.clone(),
                year: info.and_then(|p| p.year()),
                electoral_num: info.and_then(|p| p.electoral_num),
                number_bucket: info.and_then(|p| p.number_bucket()),
            }
        })
        .collect();

    for party in &missing {
        warn!(party = %party, "no metadata for party");
    }
    (joined, missing)
}

/// Distinct-party presence and total importance per cluster, most present first.
pub fn cluster_presence(colors: &[ClusteredColor]) -> Vec<ClusterPresence> {
    let total_parties = colors.iter().map(|c| c.party.as_str()).collect::<HashSet<_>>().len();

    struct Acc<'a> {
        swatch: &'a str,
        parties: HashSet<&'a str>,
        importance: f64,
    }
    let mut groups: BTreeMap<(&str, &str), Acc> = BTreeMap::new();
    for color in colors {
        let acc = groups
            .entry((color.color_cluster.as_str(), color.color_label.as_str()))
            .or_insert_with(|| Acc {
                swatch: &color.group_color_repr,
                parties: HashSet::new(),
                importance: 0.0,
            });
        acc.parties.insert(&color.party);
        acc.importance += color.color_importance;
    }

    let mut presence: Vec<ClusterPresence> = groups
        .into_iter()
        .map(|((name, label), acc)| ClusterPresence {
            cluster_label: label.to_string(),
            cluster_name: name.to_string(),
            swatch: acc.swatch.to_string(),
            parties: acc.parties.len(),
            total_parties,
            presence: 100.0 * acc.parties.len() as f64 / total_parties as f64,
            importance: acc.importance,
        })
        .collect();
    presence.sort_by(|a, b| b.presence.total_cmp(&a.presence));
    presence
}

/// Summed importance of every (party, cluster) pair, largest first.
pub fn party_cluster_shares(colors: &[ClusteredColor]) -> Vec<PartyClusterShare> {
    let mut sums: BTreeMap<(&str, &str, &str), f64> = BTreeMap::new();
    for color in colors {
        *sums
            .entry((color.party.as_str(), color.color_cluster.as_str(), color.color_label.as_str()))
            .or_insert(0.0) += color.color_importance;
    }

    let mut shares: Vec<PartyClusterShare> = sums
        .into_iter()
        .map(|((party, name, label), importance)| PartyClusterShare {
            party: party.to_string(),
            cluster_label: label.to_string(),
            cluster_name: name.to_string(),
            importance,
            predominance: 100.0 * importance,
        })
        .collect();
    shares.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    shares
}

/// All colors ordered by hue; equal hues fall back to cluster name,
/// saturation and lightness.
pub fn hue_ordering(colors: &[ClusteredColor]) -> Vec<HueOrderedColor> {
    let mut sorted: Vec<&ClusteredColor> = colors.iter().collect();
    sorted.sort_by(|a, b| {
        a.hue
            .total_cmp(&b.hue)
            .then_with(|| a.color_cluster.cmp(&b.color_cluster))
            .then_with(|| a.sat.total_cmp(&b.sat))
            .then_with(|| a.lum.total_cmp(&b.lum))
    });

    sorted
        .into_iter()
        .enumerate()
        .map(|(idx, c)| HueOrderedColor {
            position: idx + 1,
            key: c.key.clone(),
            party: c.party.clone(),
            cluster_name: c.color_cluster.clone(),
            actual_color: c.actual_color.clone(),
            hue: c.hue,
            sat: c.sat,
            lum: c.lum,
        })
        .collect()
}

/// Build the full report from clustered colors and party metadata.
pub fn build_report(colors: &[ClusteredColor], parties: &[PartyInfo]) -> Report {
    trace!(colors = colors.len(), parties = parties.len(), "aggregate::build_report");

    let (joined, missing) = join_metadata(colors, parties);
    let presence = cluster_presence(colors);
    let total_parties = presence.first().map_or(0, |p| p.total_parties);

    info!(
        total_parties,
        clusters = presence.len(),
        without_metadata = missing.len(),
        "report built"
    );

    Report {
        total_parties,
        parties_without_metadata: missing,
        presence,
        shares: party_cluster_shares(colors),
        hue_order: hue_ordering(colors),
        colors: joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn colored(party: &str, rank: usize, cluster: (&str, &str), importance: f64, hue: f32) -> ClusteredColor {
        ClusteredColor {
            party: party.into(),
            key: format!("{party}-{rank}"),
            rank,
            rgb: [0, 0, 0],
            hsl: [hue, 0.5, 0.5],
            lab: [0.0; 3],
            color_importance: importance,
            cumulative_importance: importance,
            color_label: cluster.0.into(),
            color_cluster: cluster.1.into(),
            group_color_repr: format!("RGB({},0,0)", cluster.0),
            actual_color: "RGB(0,0,0)".into(),
            hue,
            sat: 0.5,
            lum: 0.5,
        }
    }

    fn sample_rows() -> Vec<ClusteredColor> {
        vec![
            colored("PT", 1, ("3", "Red"), 0.7, 355.0),
            colored("PT", 2, ("0", "Light"), 0.2, 0.0),
            colored("PT", 3, ("3", "Red"), 0.1, 5.0),
            colored("PV", 1, ("4", "Green"), 0.6, 120.0),
            colored("PV", 2, ("0", "Light"), 0.4, 60.0),
            colored("NOVO", 1, ("2", "Yellow"), 1.0, 40.0),
        ]
    }

    #[test]
    fn metadata_derivations() {
        let info = PartyInfo {
            code: "PT".into(),
            creation_date: "10/02/1980".into(),
            electoral_num: Some(13),
        };
        assert_eq!(info.year(), Some(1980));
        assert_eq!(info.number_bucket(), Some(10));

        let blank = PartyInfo {
            code: "X".into(),
            creation_date: "".into(),
            electoral_num: None,
        };
        assert_eq!(blank.year(), None);
        assert_eq!(blank.number_bucket(), None);
    }

    #[test]
    fn presence_counts_distinct_parties() {
        let presence = cluster_presence(&sample_rows());

        assert_eq!(presence[0].cluster_name, "Light");
        assert_eq!(presence[0].parties, 2);
        assert_eq!(presence[0].total_parties, 3);
        assert_abs_diff_eq!(presence[0].presence, 200.0 / 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(presence[0].importance, 0.6, epsilon = 1e-9);
        assert_eq!(presence[0].swatch, "RGB(0,0,0)");

        let red = presence.iter().find(|p| p.cluster_name == "Red").unwrap();
        assert_eq!(red.parties, 1);
        assert_abs_diff_eq!(red.importance, 0.8, epsilon = 1e-9);
    }

    #[test]
    fn shares_sum_per_party_and_cluster() {
        let shares = party_cluster_shares(&sample_rows());

        assert_eq!(shares.len(), 5);
        assert_eq!(shares[0].party, "NOVO");
        assert_abs_diff_eq!(shares[0].predominance, 100.0, epsilon = 1e-9);

        let pt_red = shares
            .iter()
            .find(|s| s.party == "PT" && s.cluster_name == "Red")
            .unwrap();
        assert_abs_diff_eq!(pt_red.importance, 0.8, epsilon = 1e-9);
        assert!(shares.windows(2).all(|w| w[0].importance >= w[1].importance));
    }

    #[test]
    fn hue_strip_positions() {
        let order = hue_ordering(&sample_rows());
        let keys: Vec<_> = order.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["PT-2", "PT-3", "NOVO-1", "PV-2", "PV-1", "PT-1"]);
        assert_eq!(order.last().unwrap().position, 6);
    }

    #[test]
    fn join_is_left_outer() {
        let parties = vec![PartyInfo {
            code: "PT".into(),
            creation_date: "10/02/1980".into(),
            electoral_num: Some(13),
        }];
        let (joined, missing) = join_metadata(&sample_rows(), &parties);

        assert_eq!(joined.len(), 6);
        assert_eq!(joined[0].year, Some(1980));
        assert_eq!(joined[3].year, None);
        assert_eq!(missing, vec!["PV".to_string(), "NOVO".to_string()]);
    }

    #[test]
    fn report_serializes_to_json() {
        let report = build_report(&sample_rows(), &[]);
        assert_eq!(report.total_parties, 3);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["colors"][0]["party"], "PT");
        assert_eq!(json["colors"][0]["year"], serde_json::Value::Null);
        assert_eq!(json["presence"].as_array().unwrap().len(), 4);
    }
}
