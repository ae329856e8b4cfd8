//! Scale based routing of RoIs onto pyramid levels.
//!
//! - scale < finest_scale * 2: level 0
//! - finest_scale * 2 <= scale < finest_scale * 4: level 1
//! - finest_scale * 4 <= scale < finest_scale * 8: level 2
//! - scale >= finest_scale * 8: level 3
//!
//! and so on, clamped to the number of levels.

use crate::common::{Roi, Rois};

/// Keeps `log2` finite for degenerate boxes and settles exact band edges upward.
pub const LEVEL_EPS: f32 = 1e-6;

pub const DEFAULT_FINEST_SCALE: f32 = 56.0;

/// Level of a single RoI. `num_levels` of 0 is treated as 1.
pub fn roi_level(roi: &Roi, num_levels: usize, finest_scale: f32) -> usize {
    let max_level = num_levels.saturating_sub(1) as f32;
    let level = (roi.scale() / finest_scale + LEVEL_EPS).log2().floor();
    // NaN (e.g. from a NaN finest_scale) lands on level 0.
    level.clamp(0.0, max_level) as usize
}

/// Maps every RoI to its pyramid level, in input order.
pub fn assign_levels(rois: &Rois, num_levels: usize, finest_scale: f32) -> Vec<usize> {
    rois.iter()
        .map(|roi| roi_level(&roi, num_levels, finest_scale))
        .collect()
}

/// Original indices assigned to `level`, ascending.
pub fn level_indices(levels: &[usize], level: usize) -> Vec<usize> {
    levels
        .iter()
        .enumerate()
        .filter_map(|(i, &l)| (l == level).then_some(i))
        .collect()
}

/// Number of RoIs on each of the `num_levels` levels.
pub fn level_counts(levels: &[usize], num_levels: usize) -> Vec<usize> {
    let mut counts = vec![0; num_levels];
    for &l in levels {
        if let Some(c) = counts.get_mut(l) {
            *c += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: f32) -> Roi {
        Roi::new(0, 0.0, 0.0, side, side)
    }

    #[test]
    fn bands_follow_powers_of_two() {
        let fs = DEFAULT_FINEST_SCALE;
        assert_eq!(roi_level(&square(10.0), 4, fs), 0);
        assert_eq!(roi_level(&square(111.0), 4, fs), 0);
        assert_eq!(roi_level(&square(112.0), 4, fs), 1);
        assert_eq!(roi_level(&square(224.0), 4, fs), 2);
        assert_eq!(roi_level(&square(447.0), 4, fs), 2);
        assert_eq!(roi_level(&square(448.0), 4, fs), 3);
        assert_eq!(roi_level(&square(5000.0), 4, fs), 3);
    }

    #[test]
    fn malformed_boxes_go_to_level_zero() {
        let inverted = Roi::new(0, 50.0, 50.0, 0.0, 300.0);
        assert_eq!(roi_level(&inverted, 4, 56.0), 0);
        let nan = Roi::new(0, f32::NAN, 0.0, 10.0, 10.0);
        assert_eq!(roi_level(&nan, 4, 56.0), 0);
    }

    #[test]
    fn zero_levels_behaves_like_one() {
        assert_eq!(roi_level(&square(1000.0), 0, 56.0), 0);
    }

    #[test]
    fn indices_are_ascending_per_level() {
        let levels = vec![1, 0, 1, 2, 0, 1];
        assert_eq!(level_indices(&levels, 1), vec![0, 2, 5]);
        assert_eq!(level_indices(&levels, 3), Vec::<usize>::new());
        assert_eq!(level_counts(&levels, 4), vec![2, 3, 1, 0]);
    }
}
