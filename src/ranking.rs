//! Importance ranking of each party's colors.

use std::collections::HashMap;

use tracing::trace;

use crate::model::{CleanedColor, RankedColor};

/// Join key of a ranked color, e.g. `PT-1`.
pub fn color_key(party: &str, rank: usize) -> String {
    format!("{party}-{rank}")
}

/// Rank colors within each party by descending importance.
///
/// Ranks run `1..=n` per party with no gaps; equal importances keep their
/// input order. Output is grouped by party in order of first appearance and
/// sorted by rank inside each group, with the running importance total.
pub fn rank_colors(colors: &[CleanedColor]) -> Vec<RankedColor> {
    trace!(colors = colors.len(), "ranking::rank_colors");

    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&CleanedColor>> = HashMap::new();
    for color in colors {
        groups
            .entry(color.party.as_str())
            .or_insert_with(|| {
                order.push(color.party.as_str());
                Vec::new()
            })
            .push(color);
    }

    let mut ranked = Vec::with_capacity(colors.len());
    for party in order {
        let mut members = groups.remove(party).unwrap_or_default();
        // stable: ties keep extraction order
        members.sort_by(|a, b| b.color_importance.total_cmp(&a.color_importance));

        let mut cumulative = 0.0;
        for (idx, color) in members.into_iter().enumerate() {
            let rank = idx + 1;
            cumulative += color.color_importance;
            ranked.push(RankedColor {
                party: color.party.clone(),
                key: color_key(&color.party, rank),
                rank,
                rgb: color.rgb,
                hsl: color.hsl,
                lab: color.lab,
                color_importance: color.color_importance,
                cumulative_importance: cumulative,
            });
        }
    }
    ranked
}
