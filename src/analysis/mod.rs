//! Snapshot analysis modules.
//!
//! Tag-group resolution and the opportunity-cost aggregation over a
//! fetched workspace snapshot.

pub mod aggregator;
pub mod matcher;

pub use aggregator::aggregate;
pub use matcher::{approx_match, resolve_tag_group, AnalysisError};
