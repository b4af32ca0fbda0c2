//! Per-account, per-post orchestration of fetch, translate, publish, record.
pub mod report;
pub mod run;

pub use report::{AccountReport, PostOutcome, PostReport, RunReport};
pub use run::{Pipeline, PipelineSettings};
