//! Extraction run metrics.
//!
//! A small set of structs used to observe where a compression pass spends its
//! time and what it decided per family.
//!
//! The intended usage is:
//!
//! - `extract_components` for normal operation (metrics are still collected,
//!   they are just cheap timestamps).
//! - `extract_components_verbose` for profiling and for inspecting why a
//!   family was or was not compressed.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// --- Metrics -----------------------------------------------------------------

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunMetrics {
    /// Total elapsed time for the whole pass.
    pub total: Duration,
    /// Time spent building the instance inventory.
    pub inventory: Duration,
    /// Cumulative time spent in slot detection, override derivation and the
    /// size/loss gates, over all families.
    pub families: Duration,
    /// Time spent rewriting the output tree.
    pub rewrite: Duration,
}

/// What happened to one component family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FamilyOutcome {
    /// Replaced by a template plus references.
    Compressed,
    /// Template plus references would not be strictly smaller.
    NoSizeGain,
    /// Overrides restricted to the detected slots could not rebuild every
    /// member exactly.
    Lossy,
    /// Fewer than `min_instances` members left after nesting was resolved.
    TooFewEligible,
}

/// Per-family decision record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyReport {
    pub component_id: String,
    pub outcome: FamilyOutcome,
    /// Members considered (after nesting was resolved).
    pub instance_count: usize,
    pub slot_count: usize,
    pub similarity_score: f64,
    pub original_size: usize,
    /// Template plus references; zero when the family never got that far.
    pub compressed_size: usize,
    pub duration: Duration,
}
