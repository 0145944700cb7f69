//! Component extraction.
//!
//! The orchestrator of a compression pass:
//!
//! ```text
//! tree ──▶ inventory::analyze ──▶ families (outermost first)
//!                                    │
//!              ┌─────────────────────┘
//!              ▼
//!        eligible members      (no compressed ancestor, no compressed descendant)
//!              │
//!              ▼
//!        ComponentFamily::build
//!          - slots::detect over members (first member = template candidate)
//!          - bake slot defaults into the template
//!          - derive one override record per member
//!              │
//!              ▼
//!        lossless gate         apply_overrides(template, o) == member (ids aside)
//!              │
//!              ▼
//!        size gate             |template| + Σ|reference| < Σ|member|
//!              │
//!              ▼
//!        claim members ──▶ rewrite: members become {id, componentId, overrides}
//! ```
//!
//! ## Nesting
//!
//! Instances can contain instances. Families are visited by ascending minimum
//! depth (then first appearance), and a member is only eligible when neither
//! an enclosing nor an enclosed instance has been claimed yet. Once a family is
//! accepted its reference set is therefore final: nothing processed later can
//! swallow or split it, and the stats describe exactly what the output holds.
//!
//! ## Gates
//!
//! Both gates are policy, not errors. A family that fails either stays inline,
//! full size, and the outcome is reported through [`FamilyReport`].

use super::compiled_options::CompiledSlotOptions;
use super::inventory::{self, ComponentInventory, FamilyInventory};
use super::measure::serialized_size;
use super::metrics::{FamilyOutcome, FamilyReport, RunMetrics};
use super::overrides::{apply_overrides, derive_overrides};
use super::slots::{self, SlotDetectionResult};
use crate::Overrides;
use crate::node::{CompactNode, InstanceRef, Node, OutputNode};
use crate::path::{CHILDREN, Path, Step};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

// --- Public data -------------------------------------------------------------

/// A family of same-origin instances with its derived template.
#[derive(Debug, Clone)]
pub struct ComponentFamily<'a> {
    pub component_id: String,
    /// Members in document order; the first one is the template candidate.
    pub members: Vec<&'a Node>,
    pub template: Node,
    pub detection: SlotDetectionResult,
    pub instance_count: usize,
}

impl<'a> ComponentFamily<'a> {
    /// Detect slots over `members` and bake the defaults into a template.
    ///
    /// Returns `None` for an empty member list.
    pub fn build(
        component_id: impl Into<String>,
        members: Vec<&'a Node>,
        options: &CompiledSlotOptions,
    ) -> Option<Self> {
        let candidate = *members.first()?;
        let detection = slots::detect(&members, options);
        let defaults: Overrides =
            detection.slots.values().map(|slot| (slot.node_path.clone(), slot.default_value.clone())).collect();
        let template = apply_overrides(candidate, &defaults);

        Some(ComponentFamily {
            component_id: component_id.into(),
            instance_count: members.len(),
            members,
            template,
            detection,
        })
    }

    /// One override record per member, in member order.
    pub fn overrides(&self) -> Vec<Overrides> {
        self.members.iter().map(|member| derive_overrides(&self.template, member, &self.detection)).collect()
    }
}

/// Entry of the components dictionary that accompanies the output tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDefinition {
    pub component_id: String,
    /// Name of the template instance.
    pub name: String,
    pub template: Node,
    #[serde(flatten)]
    pub detection: SlotDetectionResult,
    pub instance_count: usize,
    /// Sum of the members' serialized sizes.
    pub original_size: usize,
    /// Template plus every reference record.
    pub compressed_size: usize,
}

/// Totals over the families that were actually compressed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionStats {
    pub component_count: usize,
    pub instance_count: usize,
    pub original_node_count: usize,
    pub original_size: usize,
    pub compressed_size: usize,
    pub reduction_percent: f64,
}

impl CompressionStats {
    fn record(&mut self, definition: &ComponentDefinition, node_count: usize) {
        self.component_count += 1;
        self.instance_count += definition.instance_count;
        self.original_node_count += node_count;
        self.original_size += definition.original_size;
        self.compressed_size += definition.compressed_size;
        self.reduction_percent = reduction_percent(self.original_size, self.compressed_size);
    }
}

fn reduction_percent(original: usize, compressed: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    let percent = (original as f64 - compressed as f64) / original as f64 * 100.0;
    (percent * 100.0).round() / 100.0
}

/// Everything a pass produces.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub tree: OutputNode,
    pub components: BTreeMap<String, ComponentDefinition>,
    pub stats: CompressionStats,
    pub inventory: ComponentInventory,
    pub reports: Vec<FamilyReport>,
    pub metrics: RunMetrics,
}

// --- Pass --------------------------------------------------------------------

struct Accepted {
    definition: ComponentDefinition,
    node_count: usize,
    /// (instance index, reference)
    references: Vec<(usize, InstanceRef)>,
}

/// Run one compression pass over `tree`.
pub(crate) fn extract(tree: &Node, min_instances: usize, options: &CompiledSlotOptions) -> Extraction {
    let started = Instant::now();
    let min_instances = min_instances.max(1);

    let inventory = inventory::analyze(tree, min_instances);
    let inventory_time = started.elapsed();

    let mut order: Vec<&FamilyInventory> = inventory.families.iter().collect();
    order.sort_by_key(|family| (family.min_depth, family.members.first().copied().unwrap_or(usize::MAX)));

    let mut claimed = vec![false; inventory.instances.len()];
    let mut claimed_below = vec![false; inventory.instances.len()];
    let mut references: HashMap<Path, InstanceRef> = HashMap::new();
    let mut components = BTreeMap::new();
    let mut stats = CompressionStats::default();
    let mut reports = Vec::with_capacity(order.len());

    let families_started = Instant::now();
    for family in order {
        let family_started = Instant::now();
        // A member nested inside another member of the same family is left to its outer one.
        let mut eligible: Vec<usize> = Vec::with_capacity(family.members.len());
        for &idx in &family.members {
            if claimed_below[idx] || inventory.ancestors(idx).any(|a| claimed[a] || eligible.contains(&a)) {
                continue;
            }
            eligible.push(idx);
        }

        let (mut report, accepted) = if eligible.len() < min_instances {
            (report_for(family, FamilyOutcome::TooFewEligible, eligible.len()), None)
        } else {
            compress_family(tree, &inventory, family, &eligible, options)
        };
        report.duration = family_started.elapsed();

        log::debug!(
            "[extract] `{}`: {:?} ({} member(s), {} slot(s), {} -> {} bytes)",
            report.component_id,
            report.outcome,
            report.instance_count,
            report.slot_count,
            report.original_size,
            report.compressed_size
        );

        if let Some(accepted) = accepted {
            for (idx, reference) in accepted.references {
                claimed[idx] = true;
                for ancestor in inventory.ancestors(idx) {
                    claimed_below[ancestor] = true;
                }
                references.insert(inventory.instances[idx].path.clone(), reference);
            }
            stats.record(&accepted.definition, accepted.node_count);
            components.insert(accepted.definition.component_id.clone(), accepted.definition);
        }
        reports.push(report);
    }
    let families_time = families_started.elapsed();

    let rewrite_started = Instant::now();
    let output = rewrite(tree, &mut Path::root(), &references);
    let rewrite_time = rewrite_started.elapsed();

    log::debug!(
        "[extract] {} component(s), {} instance(s), {} -> {} bytes ({}%)",
        stats.component_count,
        stats.instance_count,
        stats.original_size,
        stats.compressed_size,
        stats.reduction_percent
    );

    Extraction {
        tree: output,
        components,
        stats,
        inventory,
        reports,
        metrics: RunMetrics {
            total: started.elapsed(),
            inventory: inventory_time,
            families: families_time,
            rewrite: rewrite_time,
        },
    }
}

fn report_for(family: &FamilyInventory, outcome: FamilyOutcome, instance_count: usize) -> FamilyReport {
    FamilyReport {
        component_id: family.component_id.clone(),
        outcome,
        instance_count,
        slot_count: 0,
        similarity_score: 1.0,
        original_size: 0,
        compressed_size: 0,
        duration: Default::default(),
    }
}

fn compress_family(
    tree: &Node,
    inventory: &ComponentInventory,
    family: &FamilyInventory,
    eligible: &[usize],
    options: &CompiledSlotOptions,
) -> (FamilyReport, Option<Accepted>) {
    let members: Vec<&Node> =
        eligible.iter().filter_map(|&idx| tree.descendant(&inventory.instances[idx].path)).collect();
    let mut report = report_for(family, FamilyOutcome::Lossy, members.len());

    let Some(built) = ComponentFamily::build(family.component_id.clone(), members, options) else {
        report.outcome = FamilyOutcome::TooFewEligible;
        return (report, None);
    };
    report.slot_count = built.detection.slot_count();
    report.similarity_score = built.detection.similarity_score;

    let overrides = built.overrides();
    let lossless = built
        .members
        .iter()
        .zip(&overrides)
        .all(|(member, record)| apply_overrides(&built.template, record).eq_ignoring_ids(member));
    if !lossless {
        return (report, None);
    }

    let original_size: Option<usize> = built.members.iter().map(|member| serialized_size(*member)).sum();
    let node_count: usize = built.members.iter().map(|member| member.node_count()).sum();
    let references: Vec<(usize, InstanceRef)> = eligible
        .iter()
        .zip(built.members.iter().zip(overrides))
        .map(|(&idx, (member, overrides))| {
            (idx, InstanceRef { id: member.id.clone(), component_id: built.component_id.clone(), overrides })
        })
        .collect();
    let reference_size: Option<usize> = references.iter().map(|(_, reference)| serialized_size(reference)).sum();
    let compressed_size = serialized_size(&built.template).zip(reference_size).map(|(template, refs)| template + refs);

    report.outcome = FamilyOutcome::NoSizeGain;
    let (Some(original_size), Some(compressed_size)) = (original_size, compressed_size) else {
        return (report, None);
    };
    report.original_size = original_size;
    report.compressed_size = compressed_size;
    if compressed_size >= original_size {
        return (report, None);
    }

    report.outcome = FamilyOutcome::Compressed;
    let definition = ComponentDefinition {
        component_id: built.component_id,
        name: built.template.name.clone(),
        template: built.template,
        detection: built.detection,
        instance_count: built.instance_count,
        original_size,
        compressed_size,
    };
    (report, Some(Accepted { definition, node_count, references }))
}

// --- Rewrite -----------------------------------------------------------------

fn rewrite(node: &Node, path: &mut Path, references: &HashMap<Path, InstanceRef>) -> OutputNode {
    if let Some(reference) = references.get(path) {
        return OutputNode::Instance(reference.clone());
    }
    if references.is_empty() {
        return OutputNode::inline(node);
    }

    let children = node.children.as_ref().map(|children| {
        children
            .iter()
            .enumerate()
            .map(|(i, child)| {
                path.push(Step::Field(CHILDREN.to_string()));
                path.push(Step::Index(i));
                let out = rewrite(child, path, references);
                path.pop();
                path.pop();
                out
            })
            .collect()
    });

    OutputNode::Node(CompactNode {
        id: node.id.clone(),
        name: node.name.clone(),
        node_type: node.node_type.clone(),
        component_id: node.component_id.clone(),
        attrs: node.attrs.clone(),
        children,
    })
}
