//! Core pipeline orchestration for herbgraph.
//!
//! This crate ties together extraction, graph assembly, and the duplicate
//! sweep into one end-to-end run (see [`pipeline::run_pipeline`]).

pub mod assembler;
pub mod dedup;
pub mod pipeline;

pub use assembler::{AssemblyStats, GraphWrite, assemble, plan_herb};
pub use dedup::{DedupStats, dedup};
pub use pipeline::{
    Extraction, ExtractionStats, PipelineOptions, ProgressReporter, RunReport, SilentProgress,
    extract_records, run_pipeline,
};
