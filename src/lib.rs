//! Level-aware RoI feature extraction for two-stage detectors.
//!
//! RoIs are routed onto the levels of a feature pyramid by their scale, pooled
//! by a per-level [`LevelPooler`](extractors::LevelPooler) and returned in the
//! order they came in. [`export`] describes the same computation as a static
//! graph.

mod error;
mod utils;
pub mod common;
pub mod data;
pub mod export;
pub mod extractors;

pub use crate::common::{FeatureLevel, FeaturePyramid, Roi, RoiFeats, Rois};
pub use crate::data::{ExtractorConfig, RoiLayerConfig, RoiLayerType};
pub use crate::error::ExtractError;
pub use crate::extractors::{LevelPooler, RoIAlign, RoIPool, SingleRoIExtractor};

pub type Result<T, E = ExtractError> = std::result::Result<T, E>;

/// Builds an extractor from a JSON configuration file.
pub fn init_extractor(config_path: &str) -> Result<SingleRoIExtractor> {
    let config = ExtractorConfig::from_file(config_path)?;
    log::debug!("Loaded RoI extractor config from {config_path}\n{}", config.to_string());
    SingleRoIExtractor::new(config)
}
