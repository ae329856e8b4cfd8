use ndarray::{s, Array4, ArrayView4};
use crate::common::Rois;
use crate::extractors::level_pooler::{batch_index, finite_box, LevelPooler};

/// RoI max pooling over quantised bins. Empty bins produce 0.
#[derive(Debug, Clone)]
pub struct RoIPool {
    output_size: (usize, usize),
    spatial_scale: f32,
}

impl RoIPool {
    pub fn new(output_size: (usize, usize), spatial_scale: f32) -> Self {
        Self {
            output_size,
            spatial_scale,
        }
    }

    pub fn square(size: usize, spatial_scale: f32) -> Self {
        Self::new((size, size), spatial_scale)
    }

    /// Bin `[start, end)` along one axis, clamped to `[0, limit]`.
    fn bin_range(i: usize, bin: f32, roi_start: i64, limit: usize) -> (usize, usize) {
        let start = ((i as f32 * bin).floor() as i64).saturating_add(roi_start);
        let end = (((i + 1) as f32 * bin).ceil() as i64).saturating_add(roi_start);
        let clamp = |v: i64| v.clamp(0, limit as i64) as usize;
        (clamp(start), clamp(end))
    }
}

impl LevelPooler for RoIPool {
    fn pool_level(&self, feats: ArrayView4<f32>, rois: &Rois) -> anyhow::Result<Array4<f32>> {
        let (batch, channels, height, width) = feats.dim();
        let (pooled_h, pooled_w) = self.output_size;
        let mut output = Array4::<f32>::zeros((rois.len(), channels, pooled_h, pooled_w));

        for (n, roi) in rois.iter().enumerate() {
            let b = batch_index(roi.batch_index, batch)?;
            finite_box(&roi)?;
            let start_w = (roi.x1 * self.spatial_scale).round() as i64;
            let start_h = (roi.y1 * self.spatial_scale).round() as i64;
            let end_w = (roi.x2 * self.spatial_scale).round() as i64;
            let end_h = (roi.y2 * self.spatial_scale).round() as i64;
            let roi_w = end_w.saturating_sub(start_w).saturating_add(1).max(1) as f32;
            let roi_h = end_h.saturating_sub(start_h).saturating_add(1).max(1) as f32;
            let bin_h = roi_h / pooled_h as f32;
            let bin_w = roi_w / pooled_w as f32;

            for ph in 0..pooled_h {
                let (h0, h1) = Self::bin_range(ph, bin_h, start_h, height);
                for pw in 0..pooled_w {
                    let (w0, w1) = Self::bin_range(pw, bin_w, start_w, width);
                    if h1 <= h0 || w1 <= w0 {
                        continue;
                    }
                    let window = feats.slice(s![b, .., h0..h1, w0..w1]);
                    for (c, plane) in window.outer_iter().enumerate() {
                        output[[n, c, ph, pw]] = plane.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
                    }
                }
            }
        }
        Ok(output)
    }

    fn output_size(&self) -> (usize, usize) {
        self.output_size
    }

    fn spatial_scale(&self) -> f32 {
        self.spatial_scale
    }
}
