pub mod pipeline;
pub mod response;

pub use pipeline::{AnalysisPipeline, PipelineError};
pub use response::{analysis_response, error_response};
