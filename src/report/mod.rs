//! Report aggregation and output.

mod aggregate;
mod format;

pub use aggregate::{aggregate, AnalysisReport, ProviderResult, ReportAggregator, Summary};
pub use format::{
    build_json_report, write_json, write_pretty, write_test_run, JsonFile, JsonReport,
    ReviewedFile,
};
