//! Entity extraction from listing tables and infoboxes.
//!
//! This crate provides:
//! - [`normalize`]: fragment cleanup, stop-list, comparison keys
//! - [`table`]: named-field row decoding over `scraper` documents
//! - [`herbs`]: the primary herbs-and-effects listing
//! - [`adverse`]: the adverse-effects listing and its merge into herb records
//! - [`taxonomy`]: rank chains from detail-page infoboxes

pub mod adverse;
pub mod herbs;
pub mod normalize;
pub mod table;
pub mod taxonomy;

pub use adverse::{
    AdverseMap, AdverseOptions, AdverseRow, MergeOutcome, extract_adverse_effects,
    merge_adverse_effects,
};
pub use herbs::{HerbExtraction, HerbRow, extract_herbs};
pub use normalize::{StopList, clean_display, is_textual, normalize_key};
pub use taxonomy::{extract_taxonomy, fetch_taxonomy, resolve_taxonomy};
