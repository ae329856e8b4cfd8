use half::f16;
use ndarray::Array4;

/// Pooled RoI features `(num_rois, channels, out_h, out_w)`.
///
/// Pooling always runs in f32; `F16` is produced when the extractor is
/// configured for reduced precision output.
#[derive(Debug, Clone, PartialEq)]
pub enum RoiFeats {
    F32(Array4<f32>),
    F16(Array4<f16>),
}

impl RoiFeats {
    pub fn from_f32(x: Array4<f32>, out_fp16: bool) -> Self {
        if out_fp16 {
            Self::F16(x.mapv(f16::from_f32))
        } else {
            Self::F32(x)
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            Self::F32(x) => x.shape(),
            Self::F16(x) => x.shape(),
        }
    }

    /// Number of RoIs (rows).
    pub fn len(&self) -> usize {
        self.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_half(&self) -> bool {
        matches!(self, Self::F16(_))
    }

    pub fn as_f32(&self) -> Option<&Array4<f32>> {
        match self {
            Self::F32(x) => Some(x),
            Self::F16(_) => None,
        }
    }

    pub fn as_f16(&self) -> Option<&Array4<f16>> {
        match self {
            Self::F16(x) => Some(x),
            Self::F32(_) => None,
        }
    }

    /// Widens to f32, copying.
    pub fn to_f32(&self) -> Array4<f32> {
        match self {
            Self::F32(x) => x.clone(),
            Self::F16(x) => x.mapv(f16::to_f32),
        }
    }
}
