use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use crate::{ExtractError, Result};

/// Number of values describing one RoI: `(batch_index, x1, y1, x2, y2)`.
pub const ROI_DIM: usize = 5;

/// A single region of interest in absolute image coordinates.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize, PartialOrd)]
pub struct Roi {
    pub batch_index: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Roi {
    pub fn new(batch_index: usize, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            batch_index: batch_index as f32,
            x1,
            y1,
            x2,
            y2,
        }
    }

    /// Builds a RoI from its centre and size.
    pub fn with_cxcy_wh(batch_index: usize, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self::new(batch_index, cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    pub fn from_row(row: ArrayView1<f32>) -> Self {
        Self {
            batch_index: row[0],
            x1: row[1],
            y1: row[2],
            x2: row[3],
            y2: row[4],
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn cx(&self) -> f32 {
        (self.x1 + self.x2) * 0.5
    }

    pub fn cy(&self) -> f32 {
        (self.y1 + self.y2) * 0.5
    }

    /// `sqrt(width * height)`. Inverted or NaN boxes have scale 0.
    pub fn scale(&self) -> f32 {
        (self.width() * self.height()).max(0.0).sqrt()
    }

    /// Scales width and height by `factor` around the box centre.
    pub fn rescaled(&self, factor: f32) -> Self {
        let (cx, cy) = (self.cx(), self.cy());
        let new_w = self.width() * factor;
        let new_h = self.height() * factor;
        Self {
            batch_index: self.batch_index,
            x1: cx - new_w * 0.5,
            y1: cy - new_h * 0.5,
            x2: cx + new_w * 0.5,
            y2: cy + new_h * 0.5,
        }
    }

    pub fn as_row(&self) -> [f32; ROI_DIM] {
        [self.batch_index, self.x1, self.y1, self.x2, self.y2]
    }
}

/// Ordered set of RoIs, wrapper over an `(N, 5)` [`Array2<f32>`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rois(Array2<f32>);

impl Default for Rois {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::ops::Deref for Rois {
    type Target = Array2<f32>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<Array2<f32>> for Rois {
    type Error = ExtractError;

    fn try_from(x: Array2<f32>) -> Result<Self> {
        if x.ncols() != ROI_DIM {
            return Err(ExtractError::input(format!(
                "rois must be [num_rois, {ROI_DIM}], got {:?}",
                x.shape()
            )));
        }
        Ok(Self(x))
    }
}

impl From<&[Roi]> for Rois {
    fn from(rois: &[Roi]) -> Self {
        let mut x = Array2::zeros((rois.len(), ROI_DIM));
        for (mut row, roi) in x.outer_iter_mut().zip(rois) {
            row.assign(&ArrayView1::from(&roi.as_row()));
        }
        Self(x)
    }
}

impl From<Vec<Roi>> for Rois {
    fn from(rois: Vec<Roi>) -> Self {
        Self::from(rois.as_slice())
    }
}

impl Rois {
    pub fn empty() -> Self {
        Self(Array2::zeros((0, ROI_DIM)))
    }

    /// Builds from a flat row-major buffer of `5 * N` values.
    pub fn from_flat(xs: Vec<f32>) -> Result<Self> {
        if xs.len() % ROI_DIM != 0 {
            return Err(ExtractError::input(format!(
                "flat roi buffer length {} is not a multiple of {ROI_DIM}",
                xs.len()
            )));
        }
        let n = xs.len() / ROI_DIM;
        Ok(Self(Array2::from_shape_vec((n, ROI_DIM), xs)?))
    }

    pub fn len(&self) -> usize {
        self.0.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<Roi> {
        (i < self.len()).then(|| Roi::from_row(self.0.row(i)))
    }

    pub fn iter(&self) -> impl Iterator<Item = Roi> + '_ {
        self.0.outer_iter().map(Roi::from_row)
    }

    /// Order-preserving index select along the RoI axis.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self(self.0.select(Axis(0), indices))
    }

    /// Rescales every box around its centre by `factor`.
    pub fn rescale(&self, factor: f32) -> Self {
        let mut out = self.0.clone();
        for mut row in out.outer_iter_mut() {
            let roi = Roi::from_row(row.view()).rescaled(factor);
            row.assign(&ArrayView1::from(&roi.as_row()));
        }
        Self(out)
    }

    pub fn into_inner(self) -> Array2<f32> {
        self.0
    }
}
