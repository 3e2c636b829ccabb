//! Shared types, error model, and configuration for herbgraph.
//!
//! This crate is the foundation depended on by all other herbgraph crates.
//! It provides:
//! - [`HerbGraphError`]: the unified error type
//! - Domain types ([`HerbRecord`], [`TaxonRank`], [`Rank`], [`RunId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ExtractionConfig, GraphConfig, PipelineConfig, SourcesConfig, config_dir,
    config_file_path, default_stop_words, init_config, load_config, load_config_from,
    resolve_graph_password,
};
pub use error::{HerbGraphError, Result};
pub use types::{HerbMap, HerbRecord, Rank, RunId, TaxonRank};
