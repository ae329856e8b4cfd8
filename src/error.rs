//! Error types for RoI feature extraction.

use thiserror::Error;

/// Errors raised while building or running a RoI extractor.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The extractor configuration is unusable. Raised at construction time.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Feature maps or RoIs passed to a forward call have the wrong shape.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// A level pooler failed on a level that had RoIs assigned to it.
    #[error("pooling failed on level {level} ({num_rois} rois)")]
    LevelPooling {
        level: usize,
        num_rois: usize,
        #[source]
        source: anyhow::Error,
    },

    /// A level pooler returned a batch whose shape does not match its input.
    #[error("pooler for level {level} returned shape {got:?}, expected {expected:?}")]
    PoolerOutput {
        level: usize,
        expected: [usize; 4],
        got: Vec<usize>,
    },

    /// The per-level index lists do not cover every RoI exactly once.
    #[error("reassembly failed: {message}")]
    Reassembly { message: String },

    /// The JSON configuration could not be parsed.
    #[error("config parse")]
    ConfigParse(#[from] serde_json::Error),

    /// An export graph could not be interpreted.
    #[error("graph: {message}")]
    Graph { message: String },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

impl ExtractError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn reassembly(message: impl Into<String>) -> Self {
        Self::Reassembly {
            message: message.into(),
        }
    }

    pub fn graph(message: impl Into<String>) -> Self {
        Self::Graph {
            message: message.into(),
        }
    }
}
