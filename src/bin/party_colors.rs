use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use party_colors::model::{CleanedColor, ExtractedColor};
use party_colors::pipeline::{self, RunInput};
use party_colors::{BackgroundFilter, PipelineConfig, extract, table};

/// Dominant colors of party logos: extraction, background cleanup, clustering and summaries.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON pipeline configuration (missing keys take their defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract dominant colors from a directory of PNG logos
    Extract {
        logos: PathBuf,
        #[arg(short, long, default_value = pipeline::EXTRACTED_FILE)]
        output: PathBuf,
        /// Also save each logo flattened onto the fill color here
        #[arg(long)]
        flattened: Option<PathBuf>,
        /// Colors kept per logo
        #[arg(short = 'n', long)]
        n_colors: Option<usize>,
        /// Longest side logos are resized to before extraction
        #[arg(long)]
        downscale: Option<u32>,
    },

    /// Drop background-fill colors and normalise importance per party
    Clean {
        input: PathBuf,
        #[arg(short, long, default_value = pipeline::CLEANED_FILE)]
        output: PathBuf,
        /// Also write every row with its background verdict
        #[arg(long)]
        classified: Option<PathBuf>,
    },

    /// Rank and cluster cleaned colors
    Cluster {
        input: PathBuf,
        #[arg(short, long, default_value = pipeline::CLUSTERED_FILE)]
        output: PathBuf,
        #[arg(long, default_value = pipeline::CLUSTERS_FILE)]
        clusters: PathBuf,
        /// Number of clusters
        #[arg(short)]
        k: Option<usize>,
    },

    /// Join clustered colors with party metadata and write summaries
    Report {
        input: PathBuf,
        #[arg(short, long)]
        parties: Option<PathBuf>,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Print k-means inertia for a range of cluster counts
    Elbow {
        input: PathBuf,
        #[arg(long, default_value_t = 29)]
        max_k: usize,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run every stage from logos (directory) or extracted colors (CSV)
    Run {
        input: PathBuf,
        #[arg(short, long)]
        parties: Option<PathBuf>,
        #[arg(short, long, default_value = "out")]
        output: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Extract {
            logos,
            output,
            flattened,
            n_colors,
            downscale,
        } => {
            if let Some(n) = n_colors {
                config.extraction.n_colors = n;
            }
            if downscale.is_some() {
                config.extraction.downscale = downscale;
            }
            config.validate()?;
            let rows = extract::extract_directory(&logos, &config.extraction, flattened.as_deref())
                .context("color extraction failed")?;
            table::write_rows(&output, &rows)?;
            println!("Saved {} colors → {}", rows.len(), output.display());
        }

        Command::Clean {
            input,
            output,
            classified,
        } => {
            config.validate()?;
            let samples: Vec<ExtractedColor> = table::read_rows(&input)?;
            let outcome = BackgroundFilter::new(config.background.clone())
                .apply(&samples)
                .context("background filter failed")?;
            table::write_rows(&output, &outcome.cleaned)?;
            if let Some(path) = classified {
                table::write_rows(&path, &outcome.classified)?;
            }
            println!(
                "Kept {} of {} colors ({} parties dropped) → {}",
                outcome.cleaned.len(),
                samples.len(),
                outcome.rejected.len(),
                output.display()
            );
        }

        Command::Cluster {
            input,
            output,
            clusters,
            k,
        } => {
            if let Some(k) = k {
                config.clustering.k = k;
            }
            config.validate()?;
            let cleaned: Vec<CleanedColor> = table::read_rows(&input)?;
            let (_, clustering) = pipeline::rank_and_cluster(&cleaned, &config).context("clustering failed")?;
            pipeline::write_clustering(&clustering, &output, &clusters)?;
            for cluster in &clustering.clusters {
                println!(
                    "{:<8} {:>4} colors {:>4} parties  RGB{:?}",
                    cluster.name, cluster.total_colors, cluster.parties, cluster.representative
                );
            }
            println!("Saved → {}", output.display());
        }

        Command::Report {
            input,
            parties,
            output,
        } => {
            let report = pipeline::report_from_files(&input, parties.as_deref(), &output)
                .context("report failed")?;
            for row in &report.presence {
                println!("{:<8} {:>5.1}%", row.cluster_name, row.presence);
            }
            println!("Saved → {}", output.display());
        }

        Command::Elbow { input, max_k, json } => {
            let cleaned: Vec<CleanedColor> = table::read_rows(&input)?;
            let curve = pipeline::elbow(&cleaned, 1..=max_k, &config).context("elbow curve failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&curve)?);
            } else {
                for point in &curve {
                    println!("{:>3} {:>12.2}", point.k, point.inertia);
                }
            }
        }

        Command::Run {
            input,
            parties,
            output,
        } => {
            let source = if input.is_dir() {
                RunInput::Logos(input)
            } else {
                RunInput::Extracted(input)
            };
            let result = pipeline::run_files(&source, parties.as_deref(), &output, &config)
                .context("pipeline run failed")?;
            println!(
                "{} colors in {} clusters for {} parties → {}",
                result.clustering.colors.len(),
                result.clustering.clusters.len(),
                result.report.total_parties,
                output.display()
            );
        }
    }

    Ok(())
}
