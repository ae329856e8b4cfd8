//! Options for building RoI extractors.

use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::data::RoiLayerType;
use crate::{ExtractError, Result};

/// Per-level pooling layer options, shared by every pyramid level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiLayerConfig {
    #[serde(rename = "type")]
    pub layer_type: RoiLayerType,
    /// `(out_h, out_w)`
    pub output_size: (usize, usize),
    /// Samples per bin along each axis. `0` picks it from the RoI size.
    pub sampling_ratio: usize,
    /// Shift box coordinates by half a pixel (RoIAlign only).
    pub aligned: bool,
}

impl Default for RoiLayerConfig {
    fn default() -> Self {
        Self {
            layer_type: RoiLayerType::RoIAlign,
            output_size: (7, 7),
            sampling_ratio: 0,
            aligned: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub roi_layer: RoiLayerConfig,
    pub out_channels: usize,
    pub featmap_strides: Vec<u32>,
    /// Scale threshold of mapping to level 0.
    pub finest_scale: f32,
    /// Emit pooled features as f16.
    pub out_fp16: bool,
    /// Pool the levels concurrently on the rayon pool.
    pub parallel_levels: bool,
    pub profile: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            roi_layer: RoiLayerConfig::default(),
            out_channels: 256,
            featmap_strides: vec![],
            finest_scale: 56.0,
            out_fp16: false,
            parallel_levels: false,
            profile: false,
        }
    }
}

impl ExtractorConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| {
            ExtractError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&s)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_featmap_strides(mut self, strides: &[u32]) -> Self {
        self.featmap_strides = strides.to_vec();
        self
    }

    pub fn with_out_channels(mut self, n: usize) -> Self {
        self.out_channels = n;
        self
    }

    pub fn with_finest_scale(mut self, x: f32) -> Self {
        self.finest_scale = x;
        self
    }

    pub fn with_roi_layer(mut self, x: RoiLayerConfig) -> Self {
        self.roi_layer = x;
        self
    }

    pub fn with_layer_type(mut self, x: RoiLayerType) -> Self {
        self.roi_layer.layer_type = x;
        self
    }

    pub fn with_output_size(mut self, out_h: usize, out_w: usize) -> Self {
        self.roi_layer.output_size = (out_h, out_w);
        self
    }

    pub fn with_sampling_ratio(mut self, n: usize) -> Self {
        self.roi_layer.sampling_ratio = n;
        self
    }

    pub fn with_aligned(mut self, x: bool) -> Self {
        self.roi_layer.aligned = x;
        self
    }

    pub fn with_out_fp16(mut self, x: bool) -> Self {
        self.out_fp16 = x;
        self
    }

    pub fn with_parallel_levels(mut self, x: bool) -> Self {
        self.parallel_levels = x;
        self
    }

    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    pub fn num_levels(&self) -> usize {
        self.featmap_strides.len()
    }

    pub fn validate(&self) -> Result<()> {
        if self.featmap_strides.is_empty() {
            return Err(ExtractError::config("featmap_strides must name at least one level"));
        }
        if let Some(i) = self.featmap_strides.iter().position(|&s| s == 0) {
            return Err(ExtractError::config(format!("featmap_strides[{i}] is 0")));
        }
        let (out_h, out_w) = self.roi_layer.output_size;
        if out_h == 0 || out_w == 0 {
            return Err(ExtractError::config(format!(
                "output_size must be positive, got {out_h}x{out_w}"
            )));
        }
        if !self.finest_scale.is_finite() || self.finest_scale <= 0.0 {
            return Err(ExtractError::config(format!(
                "finest_scale must be a positive number, got {}",
                self.finest_scale
            )));
        }
        if self.out_channels == 0 {
            return Err(ExtractError::config("out_channels must be positive"));
        }
        Ok(())
    }

    pub fn to_string(&self) -> String {
        format!("RoI Layer: {} {}x{} (sampling ratio {}, aligned {})\n\
        Output Channels: {}\n\
        Featmap Strides: {:?}\n\
        Finest Scale: {}\n\
        FP16 Output: {}\n\
        Parallel Levels: {}",
                self.roi_layer.layer_type, self.roi_layer.output_size.0, self.roi_layer.output_size.1,
                self.roi_layer.sampling_ratio, self.roi_layer.aligned,
                self.out_channels, self.featmap_strides, self.finest_scale,
                self.out_fp16, self.parallel_levels)
    }
}
