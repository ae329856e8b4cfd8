mod extractor_config;
mod roi_layer_type;

pub use extractor_config::{ExtractorConfig, RoiLayerConfig};
pub use roi_layer_type::RoiLayerType;
