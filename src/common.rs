mod feature_pyramid;
mod roi;
mod roi_feats;

pub use feature_pyramid::*;
pub use roi::*;
pub use roi_feats::*;
