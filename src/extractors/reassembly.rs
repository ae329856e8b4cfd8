//! Bringing per-level batches back into the original RoI order.

use ndarray::{concatenate, Array4, ArrayView4, Axis};
use crate::{ExtractError, Result};

/// The `k` smallest (or largest) values and their positions, stable on ties.
pub fn topk(values: &[usize], k: usize, largest: bool) -> (Vec<usize>, Vec<usize>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    if largest {
        order.sort_by(|&a, &b| values[b].cmp(&values[a]));
    } else {
        order.sort_by_key(|&i| values[i]);
    }
    order.truncate(k);
    let picked = order.iter().map(|&i| values[i]).collect();
    (picked, order)
}

/// Permutation that sorts the level-major index list back to `0..n`.
///
/// `combined[perm[i]] == i` for every `i`. Fails unless `combined` holds each
/// of `0..n` exactly once.
pub fn restore_order(combined: &[usize], n: usize) -> Result<Vec<usize>> {
    if combined.len() != n {
        return Err(ExtractError::reassembly(format!(
            "{} indices collected for {n} rois",
            combined.len()
        )));
    }
    let (sorted, perm) = topk(combined, n, false);
    if let Some((i, &v)) = sorted.iter().enumerate().find(|&(i, &v)| i != v) {
        return Err(ExtractError::reassembly(format!(
            "position {i} holds roi {v}: an index is missing or duplicated"
        )));
    }
    Ok(perm)
}

/// Concatenates per-level batches along the RoI axis.
pub fn concat_levels(batches: &[Array4<f32>], trailing: (usize, usize, usize)) -> Result<Array4<f32>> {
    let (c, h, w) = trailing;
    if batches.is_empty() {
        return Ok(Array4::zeros((0, c, h, w)));
    }
    let views: Vec<ArrayView4<f32>> = batches.iter().map(|b| b.view()).collect();
    Ok(concatenate(Axis(0), &views)?)
}

/// Index select along the RoI axis.
pub fn gather_rows(x: &Array4<f32>, order: &[usize]) -> Array4<f32> {
    x.select(Axis(0), order)
}
