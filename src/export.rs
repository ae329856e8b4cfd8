mod executor;
mod graph;
mod trace;

pub use executor::GraphExecutor;
pub use graph::*;
pub use trace::{custom_op, trace};
