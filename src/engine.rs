//! Compression engine.
//!
//! This module is the internal entry point for component compression. It is
//! split into focused submodules under `src/engine/`, re-exported here so the
//! rest of the crate only ever names `crate::engine::…`.
//!
//! ## How the parts work together
//!
//! A compression pass is a pipeline:
//!
//! ```text
//! SlotOptions ──┐
//!               │  CompiledSlotOptions::new       (compiled_options.rs)
//!               └───────────────┬───────────────
//!                               │
//! tree ── inventory::analyze ───┼─ families with ≥ min_instances members
//!         (inventory.rs)        │
//!                               v
//!                     extractor::extract (extractor.rs)
//!                       - outermost families first
//!                       - slots::detect      (slots.rs, probe.rs, naming.rs)
//!                       - bake defaults, derive overrides (overrides.rs)
//!                       - lossless gate + size gate       (measure.rs)
//!                               │
//!                               v
//!                     rewrite: members ─▶ {id, componentId, overrides}
//!                               │
//!                               v
//!                    Extraction { tree, components, stats, reports, metrics }
//! ```
//!
//! ## Responsibilities by module
//!
//! - `compiled_options.rs`: turns user-facing slot options into bitmask sets
//!   and clamped numbers.
//! - `probe.rs`: one comparable location (attribute or opaque subtree) and how
//!   to read and compare it.
//! - `slots.rs`: builds the per-family value table and picks slots.
//! - `naming.rs`: advisory semantic slot names.
//! - `overrides.rs`: applies and derives override records.
//! - `inventory.rs`: groups instances by component id, records nesting.
//! - `measure.rs`: compact JSON byte counts.
//! - `extractor.rs`: orchestrates a full pass and rewrites the tree.
//! - `metrics.rs`: phase timings and per-family decision records.
//!
//! ## Debugging
//!
//! The engine logs through the `log` facade: `debug` for per-family decisions
//! and skipped override paths, `trace` for every compared path.

#[path = "engine/compiled_options.rs"]
mod compiled_options;
#[path = "engine/extractor.rs"]
mod extractor;
#[path = "engine/inventory.rs"]
mod inventory;
#[path = "engine/measure.rs"]
mod measure;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/naming.rs"]
mod naming;
#[path = "engine/overrides.rs"]
mod overrides;
#[path = "engine/probe.rs"]
mod probe;
#[path = "engine/slots.rs"]
mod slots;


pub use compiled_options::{CompiledSlotOptions, ValueTypeSet};
pub use extractor::{ComponentDefinition, ComponentFamily, CompressionStats, Extraction};
pub(crate) use extractor::extract;
pub use inventory::{ComponentInventory, FamilyInventory, InstanceEntry, analyze};
pub use metrics::{FamilyOutcome, FamilyReport, RunMetrics};
pub use naming::semantic_name;
pub use overrides::{apply_overrides, derive_overrides};
pub(crate) use slots::detect;
pub use slots::{SlotDefinition, SlotDetectionResult};
