//! Final pipeline report assembly.

mod builder;
mod previous;

pub use builder::{write_report, PipelineReport, ReportBuilder, ReportRoot};
pub use previous::PreviousReportProvider;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(String),

    #[error("failed to write report to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
