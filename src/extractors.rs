pub mod level_mapping;
pub mod reassembly;
mod level_pooler;
mod roi_align;
mod roi_pool;
mod single_level;

pub use level_pooler::*;
pub use roi_align::RoIAlign;
pub use roi_pool::RoIPool;
pub use single_level::SingleRoIExtractor;
