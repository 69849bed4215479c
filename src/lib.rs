//! # party-colors
//!
//! Color analysis of political-party logos.
//!
//! Steps performed:
//! 1. Flatten every logo onto a neutral gray and extract its dominant colors
//!    with their area share ([`extract`]).
//! 2. Drop colors that are the flattening fill rather than logo content and
//!    renormalise the rest so each party's colors sum to 1 ([`background`]).
//! 3. Rank each party's colors and run k-means over their Lab coordinates,
//!    naming the clusters by population ([`ranking`], [`cluster`], [`labeling`]).
//! 4. Join with party metadata and summarise cluster presence and per-party
//!    shares for charting ([`aggregate`]).
//!
//! Stages exchange typed rows ([`model`]) and persist them as CSV tables
//! ([`table`]); [`pipeline`] chains them.
//!
//! ```no_run
//! use party_colors::{PipelineConfig, pipeline::{self, RunInput}};
//! use std::path::Path;
//!
//! let config = PipelineConfig::default();
//! let output = pipeline::run_files(
//!     &RunInput::Logos("data/logos/png".into()),
//!     Some(Path::new("data/partidos_infos.csv")),
//!     Path::new("data/out"),
//!     &config,
//! )?;
//! println!("{} clusters", output.clustering.clusters.len());
//! # Ok::<(), party_colors::PaletteError>(())
//! ```

pub mod aggregate;
pub mod background;
pub mod cluster;
pub mod color;
pub mod config;
pub mod error;
pub mod extract;
pub mod labeling;
pub mod model;
pub mod pipeline;
pub mod ranking;
pub mod table;

pub use background::{BackgroundFilter, BackgroundVerdict, FilterOutcome};
pub use cluster::{Clustering, cluster_colors};
pub use config::PipelineConfig;
pub use error::{PaletteError, Result, Stage};
pub use labeling::{LabelPolicy, PopulationRankLabels};
pub use model::{ClassifiedColor, CleanedColor, ClusteredColor, ColorCluster, ExtractedColor, RankedColor};
pub use ranking::rank_colors;
