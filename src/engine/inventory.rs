//! Instance inventory.
//!
//! One pre-order pass over the whole tree records every node that carries a
//! `componentId`, groups those instances by id, and keeps the families that
//! occur at least `min_instances` times.
//!
//! ```text
//! tree ── work-list walk ──▶ InstanceEntry per instance (path, depth, enclosing instance)
//!                                   │
//!                                   ▼
//!                           FamilyInventory per component id (first-appearance order)
//!                             - sizes + preliminary savings estimate
//!                             - filtered by min_instances
//! ```
//!
//! The savings estimate assumes the first member becomes the template and
//! every member costs one empty reference record. It can be negative for
//! small components; it is reported as-is, the extractor makes the real call.

use super::measure::serialized_size;
use crate::Overrides;
use crate::node::{InstanceRef, Node};
use crate::path::Path;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One node carrying a component id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceEntry {
    pub component_id: String,
    pub id: String,
    /// Location in the analyzed tree.
    pub path: Path,
    pub depth: usize,
    /// Index of the nearest enclosing instance, if any.
    pub parent: Option<usize>,
    pub node_count: usize,
    /// Compact serialized size of the instance subtree.
    pub size: usize,
}

/// Summary of one component family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyInventory {
    pub component_id: String,
    /// Name of the first member.
    pub name: String,
    /// Indices into [`ComponentInventory::instances`], in document order.
    pub members: Vec<usize>,
    pub instance_count: usize,
    pub node_count: usize,
    pub original_size: usize,
    pub estimated_size: usize,
    pub estimated_savings: i64,
    /// Shallowest member depth.
    pub min_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInventory {
    pub min_instances: usize,
    pub total_nodes: usize,
    /// Every instance in the tree, qualifying or not, in document order.
    pub instances: Vec<InstanceEntry>,
    /// Families with at least `min_instances` members, in first-appearance order.
    pub families: Vec<FamilyInventory>,
}

impl ComponentInventory {
    pub fn family(&self, component_id: &str) -> Option<&FamilyInventory> {
        self.families.iter().find(|f| f.component_id == component_id)
    }

    pub fn estimated_savings(&self) -> i64 {
        self.families.iter().map(|f| f.estimated_savings).sum()
    }

    /// Indices of the enclosing instances of `instance`, nearest first.
    pub fn ancestors(&self, instance: usize) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(self.instances.get(instance).and_then(|e| e.parent), |&idx| {
            self.instances.get(idx).and_then(|e| e.parent)
        })
    }
}

/// Walk `tree` once and build the inventory. `min_instances` below 1 counts as 1.
pub fn analyze(tree: &Node, min_instances: usize) -> ComponentInventory {
    let min_instances = min_instances.max(1);
    let mut instances: Vec<InstanceEntry> = Vec::new();
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    let mut total_nodes = 0;

    // (node, path, depth, nearest enclosing instance)
    let mut stack: Vec<(&Node, Path, usize, Option<usize>)> = vec![(tree, Path::root(), 0, None)];
    while let Some((node, path, depth, enclosing)) = stack.pop() {
        total_nodes += 1;

        let mut inner = enclosing;
        if let Some(component_id) = &node.component_id {
            let idx = instances.len();
            instances.push(InstanceEntry {
                component_id: component_id.clone(),
                id: node.id.clone(),
                path: path.clone(),
                depth,
                parent: enclosing,
                node_count: node.node_count(),
                size: serialized_size(node).unwrap_or_default(),
            });
            groups
                .entry(component_id.clone())
                .or_insert_with(|| {
                    order.push(component_id.clone());
                    Vec::new()
                })
                .push(idx);
            inner = Some(idx);
        }

        for (i, child) in node.child_nodes().iter().enumerate().rev() {
            stack.push((child, path.child(i), depth + 1, inner));
        }
    }

    let families: Vec<FamilyInventory> = order
        .into_iter()
        .filter_map(|component_id| {
            let members = groups.remove(&component_id)?;
            if members.len() < min_instances {
                log::debug!(
                    "[inventory] `{}` has {} instance(s), below minimum {}",
                    component_id,
                    members.len(),
                    min_instances
                );
                return None;
            }
            Some(summarize(component_id, members, &instances, tree))
        })
        .collect();

    log::debug!(
        "[inventory] {} node(s), {} instance(s), {} qualifying famil{}",
        total_nodes,
        instances.len(),
        families.len(),
        if families.len() == 1 { "y" } else { "ies" }
    );

    ComponentInventory { min_instances, total_nodes, instances, families }
}

fn summarize(component_id: String, members: Vec<usize>, instances: &[InstanceEntry], tree: &Node) -> FamilyInventory {
    let entries: Vec<&InstanceEntry> = members.iter().map(|&idx| &instances[idx]).collect();
    let original_size: usize = entries.iter().map(|e| e.size).sum();
    let node_count = entries.iter().map(|e| e.node_count).sum();
    let min_depth = entries.iter().map(|e| e.depth).min().unwrap_or(0);
    let name = entries.first().and_then(|e| tree.descendant(&e.path)).map(|n| n.name.clone()).unwrap_or_default();

    let template_size = entries.first().map(|e| e.size).unwrap_or(0);
    let reference_size: usize = entries
        .iter()
        .map(|e| {
            let empty =
                InstanceRef { id: e.id.clone(), component_id: component_id.clone(), overrides: Overrides::new() };
            serialized_size(&empty).unwrap_or_default()
        })
        .sum();
    let estimated_size = template_size + reference_size;

    FamilyInventory {
        instance_count: members.len(),
        component_id,
        name,
        members,
        node_count,
        original_size,
        estimated_size,
        estimated_savings: original_size as i64 - estimated_size as i64,
        min_depth,
    }
}
