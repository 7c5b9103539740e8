mod pipeline;
mod report;

pub use pipeline::BatchPipeline;
pub use report::{BatchReport, StatusCounts};
