//! Error types for the party-colors pipeline.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PaletteError>;

/// Pipeline stage that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Background,
    Ranking,
    Cluster,
    Aggregate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extract => "extract",
            Stage::Background => "background",
            Stage::Ranking => "ranking",
            Stage::Cluster => "cluster",
            Stage::Aggregate => "aggregate",
        };
        f.write_str(name)
    }
}

/// Everything that can abort a pipeline run.
#[derive(Error, Debug)]
pub enum PaletteError {
    /// File could not be opened, read or written
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV table could not be parsed or written
    #[error("CSV error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// JSON config or report could not be parsed or written
    #[error("JSON error in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Logo image could not be decoded or saved
    #[error("image error on {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A CSV cell did not hold the expected value
    #[error("malformed {field}: {value:?}")]
    MalformedField { field: &'static str, value: String },

    /// Every color of a party was classified as background (or had zero area)
    #[error("party {party} has no foreground colors left after background removal")]
    NoForegroundColors { party: String },

    /// Area proportion that is not a number in [0, 1], or a party total above 1
    #[error("party {party} has invalid color proportion {value}")]
    InvalidProportion { party: String, value: f64 },

    /// Fewer distinct colors than requested clusters
    #[error("cannot build {k} clusters from {distinct} distinct colors")]
    TooFewColors { k: usize, distinct: usize },

    /// Configuration value out of range
    #[error("invalid configuration: {parameter}: {reason}")]
    InvalidConfig { parameter: &'static str, reason: String },

    /// Error tagged with the stage that produced it
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<PaletteError>,
    },
}

impl PaletteError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json { path: path.into(), source }
    }

    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Image { path: path.into(), source }
    }

    pub(crate) fn invalid_config(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            parameter,
            reason: reason.into(),
        }
    }

    /// Tag this error with a pipeline stage. Already-tagged errors keep their stage.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            tagged @ PaletteError::Stage { .. } => tagged,
            other => PaletteError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage the error was raised in, if it has been tagged.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PaletteError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Innermost error, with any stage tag removed.
    pub fn root(&self) -> &PaletteError {
        match self {
            PaletteError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_tag_is_applied_once() {
        let err = PaletteError::NoForegroundColors { party: "PT".into() }
            .in_stage(Stage::Background)
            .in_stage(Stage::Cluster);

        assert_eq!(err.stage(), Some(Stage::Background));
        assert!(matches!(err.root(), PaletteError::NoForegroundColors { party } if party == "PT"));
    }

    #[test]
    fn message_names_stage_and_party() {
        let err = PaletteError::NoForegroundColors { party: "NOVO".into() }.in_stage(Stage::Background);
        let msg = err.to_string();
        assert!(msg.starts_with("background stage failed"));
        assert!(msg.contains("NOVO"));
    }
}
