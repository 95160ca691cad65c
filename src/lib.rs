pub mod duck;
pub mod error;
pub mod load;
pub mod pipeline;
pub mod report;

pub use error::LoadError;
pub use pipeline::{run, PipelineConfig};
