use half::f16;
use ndarray::{Array4, ArrayView4};
use crate::{ExtractError, Result};

/// One feature map `(batch, channels, height, width)` and its stride relative to the image.
#[derive(Debug, Clone)]
pub struct FeatureLevel {
    pub feats: Array4<f32>,
    pub stride: u32,
}

impl FeatureLevel {
    pub fn new(feats: Array4<f32>, stride: u32) -> Self {
        Self { feats, stride }
    }

    /// Half precision maps are widened to f32 before any pooling.
    pub fn from_half(feats: &Array4<f16>, stride: u32) -> Self {
        Self::new(feats.mapv(f16::to_f32), stride)
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.feats.view()
    }

    pub fn batch_size(&self) -> usize {
        self.feats.shape()[0]
    }

    pub fn channels(&self) -> usize {
        self.feats.shape()[1]
    }

    pub fn height(&self) -> usize {
        self.feats.shape()[2]
    }

    pub fn width(&self) -> usize {
        self.feats.shape()[3]
    }
}

/// Multi-scale feature maps, finest level first. Never empty.
#[derive(Debug, Clone)]
pub struct FeaturePyramid {
    levels: Vec<FeatureLevel>,
}

impl FeaturePyramid {
    pub fn new(levels: Vec<FeatureLevel>) -> Result<Self> {
        if levels.is_empty() {
            return Err(ExtractError::input("feature pyramid has no levels"));
        }
        let channels = levels[0].channels();
        let batch = levels[0].batch_size();
        for (i, level) in levels.iter().enumerate() {
            if level.channels() != channels {
                return Err(ExtractError::input(format!(
                    "level {i} has {} channels, level 0 has {channels}",
                    level.channels()
                )));
            }
            if level.batch_size() != batch {
                return Err(ExtractError::input(format!(
                    "level {i} has batch size {}, level 0 has {batch}",
                    level.batch_size()
                )));
            }
        }
        Ok(Self { levels })
    }

    /// Builds a pyramid from `(feats, stride)` pairs.
    pub fn from_maps(maps: impl IntoIterator<Item = (Array4<f32>, u32)>) -> Result<Self> {
        Self::new(
            maps.into_iter()
                .map(|(feats, stride)| FeatureLevel::new(feats, stride))
                .collect(),
        )
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn channels(&self) -> usize {
        self.levels.first().map_or(0, FeatureLevel::channels)
    }

    pub fn batch_size(&self) -> usize {
        self.levels.first().map_or(0, FeatureLevel::batch_size)
    }

    pub fn level(&self, i: usize) -> Option<&FeatureLevel> {
        self.levels.get(i)
    }

    pub fn levels(&self) -> &[FeatureLevel] {
        &self.levels
    }

    pub fn strides(&self) -> Vec<u32> {
        self.levels.iter().map(|l| l.stride).collect()
    }
}
