//! Size-targeting compression: dimension planning, the attempt controller and batch runs.

pub mod batch;
pub mod controller;
pub mod planner;
pub mod request;
pub mod result;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{BatchOptions, BatchProgress, compress_all};
pub use controller::SizeTargetingController;
pub use planner::DimensionPlanner;
pub use request::{CompressionMethod, CompressionRequest, SourceImage};
pub use result::{CompressionResult, Outcome};
