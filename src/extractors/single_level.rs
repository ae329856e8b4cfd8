use std::time::Instant;
use ndarray::{Array4, ArrayView4};
use rayon::prelude::*;
use crate::common::{FeaturePyramid, RoiFeats, Rois};
use crate::data::ExtractorConfig;
use crate::extractors::level_mapping::{assign_levels, level_counts, level_indices};
use crate::extractors::reassembly::{concat_levels, gather_rows, restore_order};
use crate::extractors::{build_roi_layers, LevelPooler};
use crate::{utils, ExtractError, Result};

/// Extracts RoI features from a single level feature map.
///
/// With several input levels each RoI is mapped to one level according to its
/// scale (the FPN rule), pooled there, and the results are put back into the
/// input RoI order.
pub struct SingleRoIExtractor {
    config: ExtractorConfig,
    roi_layers: Vec<Box<dyn LevelPooler>>,
}

impl std::fmt::Debug for SingleRoIExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleRoIExtractor")
            .field("config", &self.config)
            .field("roi_layers", &self.roi_layers.len())
            .finish()
    }
}

impl SingleRoIExtractor {
    /// Builds the extractor with the pooling layers described by `config.roi_layer`.
    pub fn new(config: ExtractorConfig) -> Result<Self> {
        let roi_layers = build_roi_layers(&config);
        Self::with_poolers(config, roi_layers)
    }

    /// Builds the extractor around caller supplied poolers, one per stride.
    pub fn with_poolers(config: ExtractorConfig, roi_layers: Vec<Box<dyn LevelPooler>>) -> Result<Self> {
        config.validate()?;
        if roi_layers.len() != config.num_levels() {
            return Err(ExtractError::config(format!(
                "{} poolers given for {} featmap strides",
                roi_layers.len(),
                config.num_levels()
            )));
        }
        for (level, layer) in roi_layers.iter().enumerate() {
            if layer.output_size() != config.roi_layer.output_size {
                return Err(ExtractError::config(format!(
                    "pooler for level {level} has output size {:?}, expected {:?}",
                    layer.output_size(),
                    config.roi_layer.output_size
                )));
            }
        }

        log::info!(
            "RoI extractor | Layer: {} | Levels: {} | Strides: {:?} | Finest scale: {}",
            config.roi_layer.layer_type,
            config.num_levels(),
            config.featmap_strides,
            config.finest_scale,
        );
        Ok(Self { config, roi_layers })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Number of feature levels expected by `forward`.
    pub fn num_inputs(&self) -> usize {
        self.config.num_levels()
    }

    pub fn out_channels(&self) -> usize {
        self.config.out_channels
    }

    pub fn finest_scale(&self) -> f32 {
        self.config.finest_scale
    }

    pub fn featmap_strides(&self) -> &[u32] {
        &self.config.featmap_strides
    }

    pub fn output_size(&self) -> (usize, usize) {
        self.config.roi_layer.output_size
    }

    pub fn roi_layers(&self) -> &[Box<dyn LevelPooler>] {
        &self.roi_layers
    }

    /// Level index (0-based) of each RoI.
    pub fn map_roi_levels(&self, rois: &Rois, num_levels: usize) -> Vec<usize> {
        assign_levels(rois, num_levels, self.config.finest_scale)
    }

    /// Scales every RoI around its centre.
    pub fn roi_rescale(&self, rois: &Rois, scale_factor: f32) -> Rois {
        rois.rescale(scale_factor)
    }

    /// Pools every RoI; row `i` of the output belongs to `rois[i]`.
    ///
    /// `roi_scale_factor` enlarges or shrinks boxes after they have been routed,
    /// so it never changes the level a RoI is pooled from. It is ignored when
    /// there is a single level.
    pub fn forward(&self, pyramid: &FeaturePyramid, rois: &Rois, roi_scale_factor: Option<f32>) -> Result<RoiFeats> {
        let profile = self.config.profile;
        let start = Instant::now();
        let mut elapsed = start.elapsed();

        self.check_inputs(pyramid)?;
        let (out_h, out_w) = self.output_size();
        let channels = self.out_channels();
        if rois.is_empty() {
            return Ok(RoiFeats::from_f32(Array4::zeros((0, channels, out_h, out_w)), self.config.out_fp16));
        }

        let num_levels = pyramid.num_levels();
        if num_levels == 1 {
            if roi_scale_factor.is_some() {
                log::debug!("roi_scale_factor ignored with a single feature level");
            }
            let feats = self.pool_level_checked(0, pyramid.levels()[0].view(), rois)?;
            utils::trace(profile, "TIME", "Pooling", start, elapsed);
            return Ok(RoiFeats::from_f32(feats, self.config.out_fp16));
        }

        let target_lvls = self.map_roi_levels(rois, num_levels);
        let rescaled;
        let rois = match roi_scale_factor {
            Some(factor) => {
                rescaled = self.roi_rescale(rois, factor);
                &rescaled
            }
            None => rois,
        };
        log::debug!("RoIs per level: {:?}", level_counts(&target_lvls, num_levels));
        elapsed = utils::trace(profile, "TIME", "Level assignment", start, elapsed);

        let run_level = |level: usize| -> Result<(Vec<usize>, Array4<f32>)> {
            let indices = level_indices(&target_lvls, level);
            let level_rois = rois.select(&indices);
            let feats = self.pool_level_checked(level, pyramid.levels()[level].view(), &level_rois)?;
            Ok((indices, feats))
        };
        // Every level finishes before reassembly starts.
        let per_level = if self.config.parallel_levels {
            (0..num_levels).into_par_iter().map(&run_level).collect::<Result<Vec<_>>>()?
        } else {
            (0..num_levels).map(&run_level).collect::<Result<Vec<_>>>()?
        };
        elapsed = utils::trace(profile, "TIME", "Pooling", start, elapsed);

        let (indices, batches): (Vec<Vec<usize>>, Vec<Array4<f32>>) = per_level.into_iter().unzip();
        let combined = indices.concat();
        let order = restore_order(&combined, rois.len())?;
        let feats = concat_levels(&batches, (channels, out_h, out_w))?;
        let feats = gather_rows(&feats, &order);
        utils::trace(profile, "TIME", "Reassembly", start, elapsed);

        Ok(RoiFeats::from_f32(feats, self.config.out_fp16))
    }

    /// Runs the level's pooler and checks the batch it returns.
    ///
    /// A failure on a level without RoIs loses nothing and yields an empty
    /// batch; any other failure is fatal for the forward call.
    pub(crate) fn pool_level_checked(&self, level: usize, feats: ArrayView4<f32>, rois: &Rois) -> Result<Array4<f32>> {
        let (out_h, out_w) = self.output_size();
        let channels = self.out_channels();
        let pooled = match self.roi_layers[level].pool_level(feats, rois) {
            Ok(pooled) => pooled,
            Err(err) if rois.is_empty() => {
                log::debug!("Level {level} pooler failed without rois, using an empty batch: {err:#}");
                return Ok(Array4::zeros((0, channels, out_h, out_w)));
            }
            Err(source) => {
                return Err(ExtractError::LevelPooling {
                    level,
                    num_rois: rois.len(),
                    source,
                })
            }
        };

        let expected = [rois.len(), channels, out_h, out_w];
        if pooled.shape() != expected {
            return Err(ExtractError::PoolerOutput {
                level,
                expected,
                got: pooled.shape().to_vec(),
            });
        }
        Ok(pooled)
    }

    pub(crate) fn check_inputs(&self, pyramid: &FeaturePyramid) -> Result<()> {
        if pyramid.num_levels() != self.num_inputs() {
            return Err(ExtractError::input(format!(
                "expected {} feature levels, got {}",
                self.num_inputs(),
                pyramid.num_levels()
            )));
        }
        if pyramid.channels() != self.out_channels() {
            return Err(ExtractError::input(format!(
                "feature maps have {} channels, extractor expects {}",
                pyramid.channels(),
                self.out_channels()
            )));
        }
        if pyramid.strides() != self.config.featmap_strides {
            return Err(ExtractError::input(format!(
                "feature strides {:?} do not match configured {:?}",
                pyramid.strides(),
                self.config.featmap_strides
            )));
        }
        Ok(())
    }
}
