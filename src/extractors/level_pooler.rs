use ndarray::{Array4, ArrayView4};
use crate::common::{Roi, Rois};
use crate::data::{ExtractorConfig, RoiLayerType};
use crate::extractors::{RoIAlign, RoIPool};

/// Fixed-size spatial pooling of RoIs over one pyramid level.
pub trait LevelPooler: Send + Sync {
    /// Pools `rois` out of `feats` `(B, C, H, W)`.
    ///
    /// Must return `(rois.len(), C, out_h, out_w)`, including for an empty `rois`.
    fn pool_level(&self, feats: ArrayView4<f32>, rois: &Rois) -> anyhow::Result<Array4<f32>>;

    /// `(out_h, out_w)`
    fn output_size(&self) -> (usize, usize);

    /// Factor mapping image coordinates onto this level, `1 / stride`.
    fn spatial_scale(&self) -> f32;

    /// Samples per bin; 0 for adaptive or not applicable.
    fn sampling_ratio(&self) -> usize {
        0
    }
}

/// Builds one pooler per entry of `featmap_strides`.
pub fn build_roi_layers(config: &ExtractorConfig) -> Vec<Box<dyn LevelPooler>> {
    let layer = &config.roi_layer;
    config
        .featmap_strides
        .iter()
        .map(|&stride| {
            let spatial_scale = 1.0 / stride as f32;
            let pooler: Box<dyn LevelPooler> = match layer.layer_type {
                RoiLayerType::RoIAlign => Box::new(RoIAlign::new(
                    layer.output_size,
                    spatial_scale,
                    layer.sampling_ratio,
                    layer.aligned,
                )),
                RoiLayerType::RoIPool => Box::new(RoIPool::new(layer.output_size, spatial_scale)),
            };
            pooler
        })
        .collect()
}

/// Checks that a RoI's batch index addresses a map in a batch of `batch_size`.
pub(crate) fn batch_index(value: f32, batch_size: usize) -> anyhow::Result<usize> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value as usize >= batch_size {
        anyhow::bail!("roi batch index {value} out of range for batch size {batch_size}");
    }
    Ok(value as usize)
}

/// Rejects boxes with an infinite or NaN corner; they have no sampling grid.
pub(crate) fn finite_box(roi: &Roi) -> anyhow::Result<()> {
    if ![roi.x1, roi.y1, roi.x2, roi.y2].iter().all(|v| v.is_finite()) {
        anyhow::bail!(
            "roi ({}, {}, {}, {}) has a non-finite coordinate",
            roi.x1,
            roi.y1,
            roi.x2,
            roi.y2
        );
    }
    Ok(())
}
