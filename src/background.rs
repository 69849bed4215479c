//! Removal of normalisation-fill artifacts.
//!
//! Logos are flattened onto a light gray before extraction, so some of the
//! extracted colors are the fill itself rather than logo content. A color is
//! treated as fill when its floored channel mean lies in the configured band
//! and its channels barely differ (near-neutral gray).

use std::collections::HashMap;

use tracing::{debug, info, trace, warn};

use crate::color::{Rgb, lab_triple};
use crate::config::BackgroundConfig;
use crate::error::{PaletteError, Result};
use crate::model::{ClassifiedColor, CleanedColor, ExtractedColor};

/// Slack allowed on a party's summed proportions before it counts as above 1.
pub const PROPORTION_TOLERANCE: f64 = 1e-6;

/// Check every proportion lies in [0, 1] and each party's total stays at or below 1.
pub fn validate_proportions(samples: &[ExtractedColor]) -> Result<()> {
    let mut parties: Vec<&str> = Vec::new();
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for sample in samples {
        if !(0.0..=1.0).contains(&sample.proportion) {
            return Err(PaletteError::InvalidProportion {
                party: sample.party.clone(),
                value: sample.proportion,
            });
        }
        *totals.entry(sample.party.as_str()).or_insert_with(|| {
            parties.push(sample.party.as_str());
            0.0
        }) += sample.proportion;
    }

    for party in parties {
        let total = totals[party];
        if total > 1.0 + PROPORTION_TOLERANCE {
            return Err(PaletteError::InvalidProportion {
                party: party.to_string(),
                value: total,
            });
        }
    }
    Ok(())
}

/// Brightness statistics of one color and the resulting verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackgroundVerdict {
    /// Channel mean, floored to a multiple of the brightness step
    pub brightness_mean: u32,
    /// Population standard deviation of the channels, truncated
    pub brightness_std: u32,
    pub is_background: bool,
}

/// Result of filtering a full extraction table.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Every input row with its verdict, kept for inspection
    pub classified: Vec<ClassifiedColor>,
    /// Foreground rows with normalised importance
    pub cleaned: Vec<CleanedColor>,
    /// Parties left without any foreground area, in input order
    pub rejected: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BackgroundFilter {
    config: BackgroundConfig,
}

impl BackgroundFilter {
    pub fn new(config: BackgroundConfig) -> Self {
        Self { config }
    }

    /// Classify a single color.
    pub fn classify(&self, rgb: Rgb) -> BackgroundVerdict {
        let step = self.config.brightness_step.max(1);
        let sum: u32 = rgb.iter().map(|&c| c as u32).sum();
        let brightness_mean = sum / 3 / step * step;

        let mean = sum as f64 / 3.0;
        let variance = rgb
            .iter()
            .map(|&c| {
                let d = c as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / 3.0;
        let brightness_std = variance.sqrt() as u32;

        let is_background = (self.config.brightness_min..=self.config.brightness_max)
            .contains(&brightness_mean)
            && brightness_std <= self.config.max_std;

        BackgroundVerdict {
            brightness_mean,
            brightness_std,
            is_background,
        }
    }

    /// Classify every row, drop the fill colors and renormalise the rest per party.
    ///
    /// A party whose remaining area is zero cannot be normalised. With
    /// `abort_on_empty_party` set this fails with
    /// [`PaletteError::NoForegroundColors`]; otherwise the party is listed in
    /// [`FilterOutcome::rejected`] and left out of `cleaned`. Proportions are
    /// checked first with [`validate_proportions`].
    pub fn apply(&self, samples: &[ExtractedColor]) -> Result<FilterOutcome> {
        trace!(samples = samples.len(), "background::apply");
        validate_proportions(samples)?;

        let mut classified = Vec::with_capacity(samples.len());
        let mut parties: Vec<&str> = Vec::new();
        let mut total_area: HashMap<&str, f64> = HashMap::new();

        for sample in samples {
            let verdict = self.classify(sample.rgb);
            let area = total_area.entry(sample.party.as_str()).or_insert_with(|| {
                parties.push(sample.party.as_str());
                0.0
            });
            if verdict.is_background {
                debug!(party = %sample.party, rgb = ?sample.rgb, "background color");
            } else {
                *area += sample.proportion;
            }

            classified.push(ClassifiedColor {
                party: sample.party.clone(),
                rgb: sample.rgb,
                hsl: sample.hsl,
                lab: lab_triple(sample.rgb),
                proportion: sample.proportion,
                brightness_mean: verdict.brightness_mean,
                brightness_std: verdict.brightness_std,
                is_background: verdict.is_background,
            });
        }

        let rejected: Vec<String> = parties
            .iter()
            .filter(|party| !(total_area[*party] > 0.0))
            .map(|party| party.to_string())
            .collect();

        if let Some(party) = rejected.first() {
            if self.config.abort_on_empty_party {
                return Err(PaletteError::NoForegroundColors { party: party.clone() });
            }
            for party in &rejected {
                warn!(party = %party, "no foreground colors, party dropped");
            }
        }

        let cleaned: Vec<CleanedColor> = classified
            .iter()
            .filter(|row| !row.is_background)
            .filter_map(|row| {
                let total = total_area[row.party.as_str()];
                (total > 0.0).then(|| CleanedColor {
                    party: row.party.clone(),
                    rgb: row.rgb,
                    hsl: row.hsl,
                    lab: row.lab,
                    color_importance: row.proportion / total,
                })
            })
            .collect();

        info!(
            samples = samples.len(),
            background = classified.iter().filter(|r| r.is_background).count(),
            kept = cleaned.len(),
            rejected = rejected.len(),
            "background filter done"
        );

        Ok(FilterOutcome {
            classified,
            cleaned,
            rejected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample(party: &str, rgb: Rgb, proportion: f64) -> ExtractedColor {
        ExtractedColor {
            party: party.into(),
            rgb,
            hsl: [0.0, 0.0, 0.0],
            proportion,
        }
    }

    #[test]
    fn fill_color_is_background() {
        let filter = BackgroundFilter::default();
        let verdict = filter.classify([220, 220, 220]);
        assert_eq!(verdict.brightness_mean, 220);
        assert_eq!(verdict.brightness_std, 0);
        assert!(verdict.is_background);
    }

    #[test]
    fn black_is_never_background() {
        let verdict = BackgroundFilter::default().classify([0, 0, 0]);
        assert_eq!(verdict.brightness_mean, 0);
        assert!(!verdict.is_background);
    }

    #[test]
    fn band_edges() {
        let filter = BackgroundFilter::default();
        // mean 229.67 floors to 220, still inside
        assert!(filter.classify([229, 230, 230]).is_background);
        // mean 230 is above the band
        assert!(!filter.classify([230, 230, 230]).is_background);
        // mean 210 is the lower edge
        assert!(filter.classify([210, 210, 210]).is_background);
        // mean 209 floors to 200
        assert!(!filter.classify([209, 209, 209]).is_background);
        // white is bright, not fill
        assert!(!filter.classify([255, 255, 255]).is_background);
    }

    #[test]
    fn tinted_light_color_is_kept() {
        let filter = BackgroundFilter::default();
        // std of (200, 215, 240) is 16.5
        let verdict = filter.classify([200, 215, 240]);
        assert_eq!(verdict.brightness_mean, 210);
        assert_eq!(verdict.brightness_std, 16);
        assert!(!verdict.is_background);
        // std of (205, 215, 225) is 8.16
        assert!(filter.classify([205, 215, 225]).is_background);
    }

    #[test]
    fn importance_sums_to_one_per_party() {
        let samples = vec![
            sample("PT", [220, 220, 220], 0.6),
            sample("PT", [200, 16, 46], 0.3),
            sample("PT", [255, 255, 255], 0.1),
            sample("PV", [0, 128, 0], 0.7),
            sample("PV", [255, 204, 0], 0.2),
        ];
        let outcome = BackgroundFilter::default().apply(&samples).unwrap();

        assert_eq!(outcome.classified.len(), 5);
        assert!(outcome.classified[0].is_background);
        assert_eq!(outcome.cleaned.len(), 4);
        assert!(outcome.rejected.is_empty());

        for party in ["PT", "PV"] {
            let sum: f64 = outcome
                .cleaned
                .iter()
                .filter(|c| c.party == party)
                .map(|c| c.color_importance)
                .sum();
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(outcome.cleaned[0].color_importance, 0.75, epsilon = 1e-12);
    }

    #[test]
    fn empty_party_aborts_by_default() {
        let samples = vec![sample("A", [255, 0, 0], 1.0), sample("GRAY", [220, 220, 220], 1.0)];
        let err = BackgroundFilter::default().apply(&samples).unwrap_err();
        assert!(matches!(err, PaletteError::NoForegroundColors { party } if party == "GRAY"));
    }

    #[test]
    fn empty_party_can_be_dropped() {
        let config = BackgroundConfig {
            abort_on_empty_party: false,
            ..BackgroundConfig::default()
        };
        let samples = vec![
            sample("GRAY", [220, 220, 220], 1.0),
            sample("ZERO", [10, 20, 30], 0.0),
            sample("A", [255, 0, 0], 0.4),
        ];
        let outcome = BackgroundFilter::new(config).apply(&samples).unwrap();

        assert_eq!(outcome.rejected, vec!["GRAY".to_string(), "ZERO".to_string()]);
        assert_eq!(outcome.cleaned.len(), 1);
        assert_eq!(outcome.cleaned[0].party, "A");
        assert_abs_diff_eq!(outcome.cleaned[0].color_importance, 1.0, epsilon = 1e-12);
        assert!(outcome.cleaned.iter().all(|c| c.color_importance.is_finite()));
    }

    #[test]
    fn nan_proportion_is_rejected() {
        let samples = vec![sample("A", [255, 0, 0], f64::NAN), sample("A", [0, 0, 255], 0.5)];
        let err = BackgroundFilter::default().apply(&samples).unwrap_err();
        assert!(matches!(err, PaletteError::InvalidProportion { ref party, value } if party == "A" && value.is_nan()));
    }

    #[test]
    fn negative_proportion_is_rejected() {
        let samples = vec![sample("A", [255, 0, 0], 0.9), sample("A", [0, 0, 255], -0.3)];
        let err = BackgroundFilter::default().apply(&samples).unwrap_err();
        assert!(matches!(err, PaletteError::InvalidProportion { ref party, value } if party == "A" && value == -0.3));
    }

    #[test]
    fn party_total_above_one_is_rejected() {
        let samples = vec![
            sample("A", [255, 0, 0], 1.0),
            sample("B", [255, 0, 0], 0.7),
            sample("B", [0, 0, 255], 0.6),
        ];
        let err = BackgroundFilter::default().apply(&samples).unwrap_err();
        assert!(matches!(err, PaletteError::InvalidProportion { ref party, .. } if party == "B"));
        assert!(err.to_string().contains("party B"));

        // rounding slack in extracted shares is accepted
        let rounded = vec![sample("C", [255, 0, 0], 0.5 + 1e-9), sample("C", [0, 0, 255], 0.5)];
        let outcome = BackgroundFilter::default().apply(&rounded).unwrap();
        assert!(outcome.cleaned.iter().all(|c| (0.0..=1.0).contains(&c.color_importance)));
    }
}
