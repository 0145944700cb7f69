//! Component compression for design-tool node trees.
//!
//! Design documents repeat the same reusable component many times, each
//! instance differing in a handful of details. `stencil` finds those families,
//! derives one template per family plus a sparse override record per instance,
//! and rewrites the tree so every compressed instance becomes
//! `{id, componentId, overrides}`.
//!
//! ```text
//! Node tree ──▶ extract_components ──▶ { tree', components, stats }
//!                                              │
//!             restore_tree  ◀──────────────────┘
//! ```
//!
//! [`extract_components`] and [`restore_tree`] are the main entry points. The
//! pieces they are built from ([`detect_slots`], [`apply_overrides`],
//! [`analyze_components`]) are public as well.

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;
mod node;
mod path;
mod value_type;

use serde_json::Value;
use std::collections::BTreeMap;

pub use api::{
    ExtractDetails, ExtractOptions, ExtractResult, ExtractResultVerbose, SlotNaming, SlotOptions, analyze_components,
    detect_slots, extract_components, extract_components_verbose, restore_tree,
};
pub use engine::{
    CompiledSlotOptions, ComponentDefinition, ComponentFamily, ComponentInventory, CompressionStats, FamilyInventory,
    FamilyOutcome, FamilyReport, InstanceEntry, RunMetrics, SlotDefinition, SlotDetectionResult, ValueTypeSet,
    apply_overrides, derive_overrides, semantic_name,
};
pub use error::{Error, Result};
pub use node::{Attributes, CompactNode, InstanceRef, Node, OutputNode};
pub use path::{Path, Step};
pub use value_type::ValueType;

/// Sparse override record: canonical path → value. `null` means absent.
pub type Overrides = BTreeMap<String, Value>;
