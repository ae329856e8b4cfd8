use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoiLayerType {
    #[default] RoIAlign,
    RoIPool,
}

// Storing the "proper" spelling and the lowercase version.
const ROI_ALIGN: [&str; 2] = ["RoIAlign", "roialign"];
const ROI_POOL: [&str; 2] = ["RoIPool", "roipool"];

impl RoiLayerType {
    pub fn from_str(layer_type: &str) -> Option<Self> {
        match layer_type.to_lowercase().as_str() {
            "roialign" | "roi_align" => Some(RoiLayerType::RoIAlign),
            "roipool" | "roi_pool" => Some(RoiLayerType::RoIPool),
            _ => None,
        }
    }

    pub fn str(&self) -> &'static str {
        match self {
            RoiLayerType::RoIAlign => ROI_ALIGN[0],
            RoiLayerType::RoIPool => ROI_POOL[0],
        }
    }

    pub fn str_lowercase(&self) -> &'static str {
        match self {
            RoiLayerType::RoIAlign => ROI_ALIGN[1],
            RoiLayerType::RoIPool => ROI_POOL[1],
        }
    }

    pub fn all_roi_layer_types() -> Vec<String> {
        vec![
            RoiLayerType::RoIAlign.str_lowercase().to_string(),
            RoiLayerType::RoIPool.str_lowercase().to_string(),
        ]
    }

    pub fn is_valid_roi_layer_type(layer_type: &str) -> bool {
        RoiLayerType::from_str(layer_type).is_some()
    }
}

impl std::fmt::Display for RoiLayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.str())
    }
}
