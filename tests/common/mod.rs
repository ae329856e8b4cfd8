#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use ndarray::{Array, Array4, ArrayView4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roi_extract::{ExtractorConfig, FeaturePyramid, LevelPooler, Roi, Rois};

pub const CHANNELS: usize = 4;
pub const STRIDES: [u32; 4] = [4, 8, 16, 32];

/// Writes the RoI centre into channels 0 and 1 and `tag` into channel 2.
///
/// The centre survives `roi_rescale`, so it identifies a RoI after reassembly.
#[derive(Debug, Clone)]
pub struct TaggingPooler {
    pub output_size: (usize, usize),
    pub tag: f32,
}

impl TaggingPooler {
    pub fn new(tag: f32) -> Self {
        Self {
            output_size: (2, 2),
            tag,
        }
    }
}

impl LevelPooler for TaggingPooler {
    fn pool_level(&self, feats: ArrayView4<f32>, rois: &Rois) -> anyhow::Result<Array4<f32>> {
        let channels = feats.dim().1;
        let (h, w) = self.output_size;
        let mut out = Array4::zeros((rois.len(), channels, h, w));
        for (n, roi) in rois.iter().enumerate() {
            out.slice_mut(ndarray::s![n, 0, .., ..]).fill(roi.cx());
            out.slice_mut(ndarray::s![n, 1, .., ..]).fill(roi.cy());
            out.slice_mut(ndarray::s![n, 2, .., ..]).fill(self.tag);
            out.slice_mut(ndarray::s![n, 3, .., ..]).fill(roi.width());
        }
        Ok(out)
    }

    fn output_size(&self) -> (usize, usize) {
        self.output_size
    }

    fn spatial_scale(&self) -> f32 {
        1.0
    }
}

/// Fails on every call, or only on calls with no RoIs.
#[derive(Debug, Clone)]
pub struct FailingPooler {
    pub only_when_empty: bool,
}

impl LevelPooler for FailingPooler {
    fn pool_level(&self, feats: ArrayView4<f32>, rois: &Rois) -> anyhow::Result<Array4<f32>> {
        if !self.only_when_empty || rois.is_empty() {
            anyhow::bail!("unsupported shape");
        }
        TaggingPooler::new(-1.0).pool_level(feats, rois)
    }

    fn output_size(&self) -> (usize, usize) {
        (2, 2)
    }

    fn spatial_scale(&self) -> f32 {
        1.0
    }
}

/// Counts the RoIs it is handed.
#[derive(Debug, Clone, Default)]
pub struct CountingPooler {
    pub seen: Arc<AtomicUsize>,
    pub calls: Arc<AtomicUsize>,
}

impl LevelPooler for CountingPooler {
    fn pool_level(&self, feats: ArrayView4<f32>, rois: &Rois) -> anyhow::Result<Array4<f32>> {
        self.seen.fetch_add(rois.len(), Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        TaggingPooler::new(0.0).pool_level(feats, rois)
    }

    fn output_size(&self) -> (usize, usize) {
        (2, 2)
    }

    fn spatial_scale(&self) -> f32 {
        1.0
    }
}

/// Config matching the test poolers (2x2 output, 4 channels).
pub fn tagging_config(strides: &[u32]) -> ExtractorConfig {
    ExtractorConfig::new()
        .with_featmap_strides(strides)
        .with_out_channels(CHANNELS)
        .with_output_size(2, 2)
}

pub fn tagging_poolers(num_levels: usize) -> Vec<Box<dyn LevelPooler>> {
    (0..num_levels)
        .map(|l| Box::new(TaggingPooler::new(l as f32)) as Box<dyn LevelPooler>)
        .collect()
}

/// Pyramid over a `image_size` square image with smooth, level dependent values.
pub fn pyramid(strides: &[u32], channels: usize, image_size: usize) -> FeaturePyramid {
    FeaturePyramid::from_maps(strides.iter().enumerate().map(|(level, &stride)| {
        let side = (image_size / stride as usize).max(1);
        let feats = Array::from_shape_fn((2, channels, side, side), |(b, c, y, x)| {
            (b * 7 + c * 3 + level) as f32 + 0.1 * y as f32 + 0.01 * x as f32
        });
        (feats, stride)
    }))
    .unwrap()
}

/// `n` boxes with distinct centres and side lengths spread over all bands.
pub fn random_rois(n: usize, seed: u64) -> Rois {
    let mut rng = StdRng::seed_from_u64(seed);
    let rois: Vec<Roi> = (0..n)
        .map(|i| {
            let side = rng.gen_range(8.0f32..600.0);
            let aspect = rng.gen_range(0.5f32..2.0);
            let cx = 5.0 + i as f32 * 3.0;
            let cy = rng.gen_range(50.0f32..400.0);
            Roi::with_cxcy_wh(rng.gen_range(0..2), cx, cy, side * aspect, side / aspect)
        })
        .collect();
    Rois::from(rois)
}

pub fn square(batch: usize, cx: f32, cy: f32, side: f32) -> Roi {
    Roi::with_cxcy_wh(batch, cx, cy, side, side)
}
