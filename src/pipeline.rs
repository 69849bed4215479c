//! Stage chaining, in memory and against files on disk.
//!
//! Each run reads its inputs whole and overwrites its outputs. Any error
//! aborts the run, tagged with the stage it came from.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use palette::Lab;

use tracing::info;

use crate::aggregate::{self, PartyInfo, Report};
use crate::background::{BackgroundFilter, FilterOutcome};
use crate::cluster::{self, Clustering, InertiaPoint};
use crate::config::PipelineConfig;
use crate::error::{Result, Stage};
use crate::extract;
use crate::labeling::PopulationRankLabels;
use crate::model::{CleanedColor, ClusteredColor, ExtractedColor, RankedColor};
use crate::ranking;
use crate::table;

pub const EXTRACTED_FILE: &str = "colors_with_background.csv";
pub const CLASSIFIED_FILE: &str = "colors_classified.csv";
pub const CLEANED_FILE: &str = "colors_cleaned.csv";
pub const CLUSTERED_FILE: &str = "party_colors_infos.csv";
pub const CLUSTERS_FILE: &str = "color_clusters.csv";
pub const PRESENCE_FILE: &str = "cluster_presence.csv";
pub const SHARES_FILE: &str = "party_cluster_shares.csv";
pub const REPORT_FILE: &str = "report.json";

/// Where a full run starts from.
#[derive(Debug, Clone)]
pub enum RunInput {
    /// Directory of PNG logos
    Logos(PathBuf),
    /// Previously extracted `colors_with_background.csv`
    Extracted(PathBuf),
}

/// Every table produced by one run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub filter: FilterOutcome,
    pub ranked: Vec<RankedColor>,
    pub clustering: Clustering,
    pub report: Report,
}

/// Label policy described by the configuration.
pub fn label_policy(config: &PipelineConfig) -> PopulationRankLabels {
    PopulationRankLabels::new(config.cluster_names.0.clone())
}

/// Background filter, ranking and clustering of extracted colors.
pub fn clean_rank_cluster(
    samples: &[ExtractedColor],
    config: &PipelineConfig,
) -> Result<(FilterOutcome, Vec<RankedColor>, Clustering)> {
    let filter = BackgroundFilter::new(config.background.clone())
        .apply(samples)
        .map_err(|e| e.in_stage(Stage::Background))?;
    let (ranked, clustering) = rank_and_cluster(&filter.cleaned, config)?;
    Ok((filter, ranked, clustering))
}

/// Ranking and clustering of cleaned colors.
pub fn rank_and_cluster(
    cleaned: &[CleanedColor],
    config: &PipelineConfig,
) -> Result<(Vec<RankedColor>, Clustering)> {
    let ranked = ranking::rank_colors(cleaned);
    let clustering = cluster::cluster_colors(&ranked, &config.clustering, &label_policy(config))
        .map_err(|e| e.in_stage(Stage::Cluster))?;
    Ok((ranked, clustering))
}

/// Elbow curve of cleaned colors for every `k` in `ks`.
pub fn elbow(
    cleaned: &[CleanedColor],
    ks: RangeInclusive<usize>,
    config: &PipelineConfig,
) -> Result<Vec<InertiaPoint>> {
    config.validate()?;
    let raw: Vec<Lab> = cleaned.iter().map(|c| Lab::new(c.lab[0], c.lab[1], c.lab[2])).collect();
    let features = if config.clustering.standardize {
        cluster::standardize(&raw)
    } else {
        raw
    };
    cluster::inertia_curve(&features, ks, &config.clustering).map_err(|e| e.in_stage(Stage::Cluster))
}

/// Run stages 2 to 4 in memory.
pub fn run_core(
    samples: &[ExtractedColor],
    parties: &[PartyInfo],
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    config.validate()?;
    let (filter, ranked, clustering) = clean_rank_cluster(samples, config)?;
    let report = aggregate::build_report(&clustering.colors, parties);
    Ok(PipelineOutput {
        filter,
        ranked,
        clustering,
        report,
    })
}

/// Write the clustered rows and the cluster table.
pub fn write_clustering(clustering: &Clustering, rows_path: &Path, clusters_path: &Path) -> Result<()> {
    table::write_rows(rows_path, &clustering.colors)?;
    table::write_rows(clusters_path, &clustering.clusters)
}

/// Write the summary tables and `report.json` into `out_dir`.
pub fn write_report(report: &Report, out_dir: &Path) -> Result<()> {
    table::write_rows(&out_dir.join(PRESENCE_FILE), &report.presence)?;
    table::write_rows(&out_dir.join(SHARES_FILE), &report.shares)?;
    table::write_json(&out_dir.join(REPORT_FILE), report)
}

/// Read party metadata, or none when no file is given.
pub fn read_parties(path: Option<&Path>) -> Result<Vec<PartyInfo>> {
    match path {
        Some(path) => table::read_rows(path).map_err(|e| e.in_stage(Stage::Aggregate)),
        None => Ok(Vec::new()),
    }
}

/// Aggregate a `party_colors_infos.csv` with party metadata into `out_dir`.
pub fn report_from_files(clustered: &Path, parties: Option<&Path>, out_dir: &Path) -> Result<Report> {
    let colors: Vec<ClusteredColor> = table::read_rows(clustered).map_err(|e| e.in_stage(Stage::Aggregate))?;
    let parties = read_parties(parties)?;
    let report = aggregate::build_report(&colors, &parties);
    write_report(&report, out_dir).map_err(|e| e.in_stage(Stage::Aggregate))?;
    Ok(report)
}

/// Run the whole pipeline from logos or extracted colors, writing every table into `out_dir`.
pub fn run_files(
    input: &RunInput,
    parties: Option<&Path>,
    out_dir: &Path,
    config: &PipelineConfig,
) -> Result<PipelineOutput> {
    config.validate()?;

    let samples: Vec<ExtractedColor> = match input {
        RunInput::Logos(dir) => {
            let flattened = out_dir.join("flattened");
            let rows = extract::extract_directory(dir, &config.extraction, Some(&flattened))
                .map_err(|e| e.in_stage(Stage::Extract))?;
            table::write_rows(&out_dir.join(EXTRACTED_FILE), &rows).map_err(|e| e.in_stage(Stage::Extract))?;
            rows
        }
        RunInput::Extracted(path) => table::read_rows(path).map_err(|e| e.in_stage(Stage::Background))?,
    };

    let parties = read_parties(parties)?;
    let output = run_core(&samples, &parties, config)?;

    table::write_rows(&out_dir.join(CLASSIFIED_FILE), &output.filter.classified)
        .and_then(|_| table::write_rows(&out_dir.join(CLEANED_FILE), &output.filter.cleaned))
        .map_err(|e| e.in_stage(Stage::Background))?;
    write_clustering(
        &output.clustering,
        &out_dir.join(CLUSTERED_FILE),
        &out_dir.join(CLUSTERS_FILE),
    )
    .map_err(|e| e.in_stage(Stage::Cluster))?;
    write_report(&output.report, out_dir).map_err(|e| e.in_stage(Stage::Aggregate))?;

    info!(
        out_dir = %out_dir.display(),
        samples = samples.len(),
        kept = output.filter.cleaned.len(),
        clusters = output.clustering.clusters.len(),
        "pipeline finished"
    );
    Ok(output)
}
