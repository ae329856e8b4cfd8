//! RoI Align pooling.
//!
//! Every output bin averages a regular grid of bilinearly interpolated samples,
//! so no coordinate is quantised.

use ndarray::{s, Array4, ArrayView2, ArrayView4};
use crate::common::Rois;
use crate::extractors::level_pooler::{batch_index, finite_box, LevelPooler};

#[derive(Debug, Clone)]
pub struct RoIAlign {
    output_size: (usize, usize),
    spatial_scale: f32,
    sampling_ratio: usize,
    aligned: bool,
}

/// Bilinear weights of one sample, precomputed once per bin and shared across channels.
#[derive(Debug, Clone, Copy, Default)]
struct Sample {
    y_low: usize,
    x_low: usize,
    y_high: usize,
    x_high: usize,
    w1: f32,
    w2: f32,
    w3: f32,
    w4: f32,
}

impl RoIAlign {
    pub fn new(output_size: (usize, usize), spatial_scale: f32, sampling_ratio: usize, aligned: bool) -> Self {
        Self {
            output_size,
            spatial_scale,
            sampling_ratio,
            aligned,
        }
    }

    /// Square output constructor
    pub fn square(size: usize, spatial_scale: f32, sampling_ratio: usize) -> Self {
        Self::new((size, size), spatial_scale, sampling_ratio, true)
    }

    /// Returns `None` when the sample falls outside the map and contributes nothing.
    fn sample(y: f32, x: f32, height: usize, width: usize) -> Option<Sample> {
        if !y.is_finite() || !x.is_finite() || y < -1.0 || y > height as f32 || x < -1.0 || x > width as f32 {
            return None;
        }
        let mut y = y.max(0.0);
        let mut x = x.max(0.0);

        let mut y_low = y as usize;
        let mut x_low = x as usize;
        let y_high;
        let x_high;
        if y_low >= height - 1 {
            y_low = height - 1;
            y_high = height - 1;
            y = y_low as f32;
        } else {
            y_high = y_low + 1;
        }
        if x_low >= width - 1 {
            x_low = width - 1;
            x_high = width - 1;
            x = x_low as f32;
        } else {
            x_high = x_low + 1;
        }

        let ly = y - y_low as f32;
        let lx = x - x_low as f32;
        let hy = 1.0 - ly;
        let hx = 1.0 - lx;
        Some(Sample {
            y_low,
            x_low,
            y_high,
            x_high,
            w1: hy * hx,
            w2: hy * lx,
            w3: ly * hx,
            w4: ly * lx,
        })
    }

    fn interpolate(plane: &ArrayView2<f32>, s: &Sample) -> f32 {
        s.w1 * plane[[s.y_low, s.x_low]]
            + s.w2 * plane[[s.y_low, s.x_high]]
            + s.w3 * plane[[s.y_high, s.x_low]]
            + s.w4 * plane[[s.y_high, s.x_high]]
    }
}

impl LevelPooler for RoIAlign {
    fn pool_level(&self, feats: ArrayView4<f32>, rois: &Rois) -> anyhow::Result<Array4<f32>> {
        let (batch, channels, height, width) = feats.dim();
        let (pooled_h, pooled_w) = self.output_size;
        let mut output = Array4::<f32>::zeros((rois.len(), channels, pooled_h, pooled_w));
        if rois.is_empty() || height == 0 || width == 0 {
            return Ok(output);
        }

        let offset = if self.aligned { 0.5 } else { 0.0 };
        let mut samples: Vec<Sample> = Vec::new();
        for (n, roi) in rois.iter().enumerate() {
            let b = batch_index(roi.batch_index, batch)?;
            finite_box(&roi)?;
            let start_w = roi.x1 * self.spatial_scale - offset;
            let start_h = roi.y1 * self.spatial_scale - offset;
            let mut roi_w = roi.x2 * self.spatial_scale - offset - start_w;
            let mut roi_h = roi.y2 * self.spatial_scale - offset - start_h;
            if !self.aligned {
                // Malformed boxes are forced to 1x1.
                roi_w = roi_w.max(1.0);
                roi_h = roi_h.max(1.0);
            }

            let bin_h = roi_h / pooled_h as f32;
            let bin_w = roi_w / pooled_w as f32;
            let grid_h = match self.sampling_ratio {
                0 => (roi_h / pooled_h as f32).ceil().max(0.0) as usize,
                ratio => ratio,
            };
            let grid_w = match self.sampling_ratio {
                0 => (roi_w / pooled_w as f32).ceil().max(0.0) as usize,
                ratio => ratio,
            };
            let count = (grid_h * grid_w).max(1) as f32;

            let map = feats.slice(s![b, .., .., ..]);
            for ph in 0..pooled_h {
                for pw in 0..pooled_w {
                    samples.clear();
                    for iy in 0..grid_h {
                        let y = start_h + ph as f32 * bin_h + (iy as f32 + 0.5) * bin_h / grid_h as f32;
                        for ix in 0..grid_w {
                            let x = start_w + pw as f32 * bin_w + (ix as f32 + 0.5) * bin_w / grid_w as f32;
                            samples.extend(Self::sample(y, x, height, width));
                        }
                    }
                    for c in 0..channels {
                        let plane = map.slice(s![c, .., ..]);
                        let sum: f32 = samples.iter().map(|s| Self::interpolate(&plane, s)).sum();
                        output[[n, c, ph, pw]] = sum / count;
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

    fn sampling_ratio(&self) -> usize {
        self.sampling_ratio
    }
}
