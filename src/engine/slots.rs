//! Slot detection.
//!
//! Given a family of instances sharing one component id, decide which
//! addressable locations vary across the family ("slots") and which stay
//! constant.
//!
//! ## Pipeline
//!
//! ```text
//! instances ──▶ ValueTable::build          one row per path, one column per instance
//!                 - pre-order walk (work-list, no recursion)
//!                 - attributes per ValueType, down to max_depth
//!                 - children below max_depth as opaque subtrees
//!                 - child presence, where some instance lacks the child
//!                       │
//!                       ▼
//!               analyze(row)               distinct states + modal agreement
//!                       │
//!                       ▼
//!               policy (CompiledSlotOptions)
//!                 - matching rows count toward similarity
//!                 - candidates: agreement < min_similarity
//!                 - never_slots drops, always_slots forces
//!                 - max_slots keeps highest variation, ties by first appearance
//!                       │
//!                       ▼
//!               SlotDetectionResult
//! ```
//!
//! ## Invariants
//!
//! - Absence is a value state of its own: a path present in some instances and
//!   missing from others is a legitimate variation, never an error.
//! - Row order is first-appearance order (instance order, then pre-order), so
//!   results are deterministic for identical input.
//! - `max_slots` only trims what is reported; `matching_paths` and
//!   `total_paths` always describe the full table.

use super::compiled_options::CompiledSlotOptions;
use super::naming::name_slot;
use super::probe::{Probe, ProbeKind, Sample};
use crate::ValueType;
use crate::node::Node;
use crate::path::Path;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

// --- Results -----------------------------------------------------------------

/// One varying (or forced) location within a component family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDefinition {
    /// Stable key: the canonical path.
    pub slot_id: String,
    pub node_path: String,
    pub value_type: ValueType,
    /// Value in the template instance (`null` when absent there).
    pub default_value: Value,
    /// Instance label → observed value (`null` when absent).
    pub variations: BTreeMap<String, Value>,
    /// Best-effort human label; not unique.
    pub semantic_name: String,
    /// Number of instances with a defined value at this path.
    pub instance_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDetectionResult {
    pub slots: BTreeMap<String, SlotDefinition>,
    pub similarity_score: f64,
    pub total_paths: usize,
    pub matching_paths: usize,
}

impl SlotDetectionResult {
    /// Result for families too small to compare.
    pub fn empty() -> Self {
        SlotDetectionResult { slots: BTreeMap::new(), similarity_score: 1.0, total_paths: 0, matching_paths: 0 }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_paths(&self) -> impl Iterator<Item = &str> {
        self.slots.values().map(|slot| slot.node_path.as_str())
    }
}

// --- Value table -------------------------------------------------------------

struct Row<'a> {
    probe: Probe,
    /// Name of the node owning the value, from the first instance that has it.
    owner_name: String,
    samples: Vec<Option<Sample<'a>>>,
}

struct ValueTable<'a> {
    rows: Vec<Row<'a>>,
    index: HashMap<String, usize>,
    width: usize,
}

impl<'a> ValueTable<'a> {
    fn build(instances: &[&'a Node], max_depth: Option<usize>) -> Self {
        let mut table = ValueTable { rows: Vec::new(), index: HashMap::new(), width: instances.len() };

        for (column, instance) in instances.iter().enumerate() {
            let mut stack: Vec<(&'a Node, Path, usize)> = vec![(*instance, Path::root(), 0)];

            while let Some((node, path, depth)) = stack.pop() {
                for value_type in ValueType::ALL {
                    for field in value_type.fields(node) {
                        let sample = value_type.read(node, &field).map(Sample::Value);
                        table.record(column, Probe::attribute(&path, value_type, &field), &node.name, sample);
                    }
                }

                let children = node.child_nodes();
                if max_depth.is_some_and(|max| depth >= max) {
                    for (i, child) in children.iter().enumerate() {
                        let probe = Probe::subtree(path.child(i));
                        table.record(column, probe, &child.name, Some(Sample::Subtree(child)));
                    }
                } else {
                    for (i, child) in children.iter().enumerate() {
                        let probe = Probe::presence(path.child(i));
                        table.record(column, probe, &child.name, Some(Sample::Subtree(child)));
                    }
                    for (i, child) in children.iter().enumerate().rev() {
                        stack.push((child, path.child(i), depth + 1));
                    }
                }
            }
        }

        // Presence only matters where some instance lacks the child.
        table.rows.retain(|row| row.probe.kind != ProbeKind::Presence || row.samples.iter().any(Option::is_none));
        table.index.clear();
        table
    }

    fn record(&mut self, column: usize, probe: Probe, owner_name: &str, sample: Option<Sample<'a>>) {
        let idx = match self.index.get(&probe.canonical) {
            Some(&idx) => idx,
            None => {
                let idx = self.rows.len();
                self.index.insert(probe.canonical.clone(), idx);
                self.rows.push(Row { probe, owner_name: owner_name.to_string(), samples: vec![None; self.width] });
                idx
            }
        };
        self.rows[idx].samples[column] = sample;
    }
}

struct RowStats {
    /// Number of distinct value states (absence included).
    distinct: usize,
    /// Share of instances holding the most common state.
    agreement: f64,
}

fn analyze(row: &Row<'_>) -> RowStats {
    // (representative column, count)
    let mut groups: Vec<(usize, usize)> = Vec::new();
    for (column, sample) in row.samples.iter().enumerate() {
        match groups.iter().position(|&(rep, _)| row.probe.same(row.samples[rep].as_ref(), sample.as_ref())) {
            Some(g) => groups[g].1 += 1,
            None => groups.push((column, 1)),
        }
    }

    let top = groups.iter().map(|&(_, count)| count).max().unwrap_or(0);
    let width = row.samples.len().max(1);
    RowStats { distinct: groups.len(), agreement: top as f64 / width as f64 }
}

// --- Detection ---------------------------------------------------------------

/// Compare `instances` path by path. The first instance is the template
/// candidate and supplies every slot's default value.
pub(crate) fn detect(instances: &[&Node], options: &CompiledSlotOptions) -> SlotDetectionResult {
    if instances.len() < 2 {
        return SlotDetectionResult::empty();
    }

    let table = ValueTable::build(instances, options.max_depth);
    let labels = instance_labels(instances);

    let mut matching_paths = 0;
    // (row index, distinct states)
    let mut picked: Vec<(usize, usize)> = Vec::new();

    for (row_idx, row) in table.rows.iter().enumerate() {
        let stats = analyze(row);
        let matches = stats.distinct == 1;
        if matches {
            matching_paths += 1;
        }

        let value_type = row.probe.value_type();
        let candidate = !matches && options.is_slot_candidate(stats.agreement);
        let selected = options.admits(value_type) && (candidate || options.forces(value_type));

        log::trace!(
            "[slots] path={} type={} distinct={} agreement={:.3} selected={}",
            row.probe.canonical,
            value_type,
            stats.distinct,
            stats.agreement,
            selected
        );

        if selected {
            picked.push((row_idx, stats.distinct));
        }
    }

    if let Some(cap) = options.max_slots {
        picked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        picked.truncate(cap);
    }

    let slots: BTreeMap<String, SlotDefinition> = picked
        .into_iter()
        .map(|(row_idx, _)| {
            let slot = slot_definition(&table.rows[row_idx], &labels, options);
            (slot.slot_id.clone(), slot)
        })
        .collect();

    let total_paths = table.rows.len();
    let similarity_score = if total_paths == 0 { 1.0 } else { matching_paths as f64 / total_paths as f64 };

    log::debug!(
        "[slots] {} instance(s): {} slot(s), {}/{} paths matching (similarity {:.3})",
        instances.len(),
        slots.len(),
        matching_paths,
        total_paths,
        similarity_score
    );

    SlotDetectionResult { slots, similarity_score, total_paths, matching_paths }
}

fn slot_definition(row: &Row<'_>, labels: &[String], options: &CompiledSlotOptions) -> SlotDefinition {
    let observed = |sample: &Option<Sample<'_>>| sample.as_ref().map(Sample::to_value).unwrap_or(Value::Null);
    let value_type = row.probe.value_type();

    SlotDefinition {
        slot_id: row.probe.canonical.clone(),
        node_path: row.probe.canonical.clone(),
        value_type,
        default_value: row.samples.first().map(observed).unwrap_or(Value::Null),
        variations: labels.iter().cloned().zip(row.samples.iter().map(observed)).collect(),
        semantic_name: name_slot(options.naming, &row.probe.canonical, &row.owner_name, value_type, row.probe.field()),
        instance_count: row.samples.iter().filter(|s| s.is_some()).count(),
    }
}

/// Stable per-instance labels: the instance id, disambiguated by position when
/// ids are missing or repeated. Every emitted label is unique.
fn instance_labels(instances: &[&Node]) -> Vec<String> {
    let mut seen = HashSet::new();
    instances
        .iter()
        .enumerate()
        .map(|(idx, node)| {
            let mut label = if node.id.is_empty() { format!("#{idx}") } else { node.id.clone() };
            while !seen.insert(label.clone()) {
                label = format!("{label}#{idx}");
            }
            label
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SlotOptions;
    use serde_json::json;

    fn node(value: Value) -> Node {
        serde_json::from_value(value).unwrap()
    }

    fn chip(id: &str, label: &str, extra: Value) -> Node {
        let mut value = json!({
            "id": id, "name": "Chip", "type": "INSTANCE", "componentId": "chip",
            "children": [
                {"id": format!("{id}:l"), "name": "Label", "type": "TEXT", "text": label},
                {"id": format!("{id}:i"), "name": "Icon", "type": "VECTOR", "visible": true}
            ]
        });
        if let (Some(target), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            target.extend(extra.clone());
        }
        node(value)
    }

    fn run(instances: &[Node], options: SlotOptions) -> SlotDetectionResult {
        let refs: Vec<&Node> = instances.iter().collect();
        detect(&refs, &CompiledSlotOptions::new(&options))
    }

    #[test]
    fn degenerate_families_have_no_slots() {
        let none = run(&[], SlotOptions::default());
        let one = run(&[chip("1", "A", json!({}))], SlotOptions::default());
        for result in [none, one] {
            assert!(result.slots.is_empty());
            assert_eq!(result.similarity_score, 1.0);
            assert_eq!(result.total_paths, 0);
        }
    }

    #[test]
    fn finds_varying_text_with_defaults_and_labels() {
        let family = [chip("1", "Yes", json!({})), chip("2", "No", json!({})), chip("3", "Yes", json!({}))];
        let result = run(&family, SlotOptions::default());

        assert_eq!(result.slots.len(), 1);
        let slot = &result.slots["children[0].text"];
        assert_eq!(slot.value_type, ValueType::Text);
        assert_eq!(slot.default_value, json!("Yes"));
        assert_eq!(slot.variations["2"], json!("No"));
        assert_eq!(slot.variations.len(), 3);
        assert_eq!(slot.instance_count, 3);
        assert_eq!(slot.semantic_name, "labelText");
        assert_eq!(result.matching_paths + 1, result.total_paths);
    }

    #[test]
    fn absence_is_a_distinct_state() {
        let family = [chip("1", "A", json!({"cornerRadius": 4})), chip("2", "A", json!({}))];
        let result = run(&family, SlotOptions::default());

        let slot = &result.slots["cornerRadius"];
        assert_eq!(slot.value_type, ValueType::Property);
        assert_eq!(slot.variations["2"], Value::Null);
        assert_eq!(slot.instance_count, 1);
    }

    #[test]
    fn never_and_always_policies() {
        let family = [chip("1", "A", json!({"opacity": 0.5})), chip("2", "B", json!({"opacity": 1}))];

        let never = run(&family, SlotOptions { never_slots: vec![ValueType::Text], ..Default::default() });
        assert!(!never.slots.contains_key("children[0].text"));
        assert!(never.slots.contains_key("opacity"));

        let always = run(&family, SlotOptions { always_slots: vec![ValueType::Visibility], ..Default::default() });
        let forced = &always.slots["children[1].visible"];
        assert_eq!(forced.variations.values().collect::<Vec<_>>(), vec![&json!(true), &json!(true)]);
        assert_eq!(always.similarity_score, never.similarity_score);
    }

    #[test]
    fn max_slots_keeps_highest_variation_first() {
        let family = [
            chip("1", "A", json!({"cornerRadius": 1, "layoutMode": "ROW"})),
            chip("2", "B", json!({"cornerRadius": 2, "layoutMode": "ROW"})),
            chip("3", "C", json!({"cornerRadius": 2, "layoutMode": "COLUMN"})),
        ];
        let full = run(&family, SlotOptions::default());
        assert_eq!(full.slots.len(), 3);

        let capped = run(&family, SlotOptions { max_slots: Some(1), ..Default::default() });
        assert_eq!(capped.slots.keys().collect::<Vec<_>>(), vec!["children[0].text"]);
        assert_eq!(capped.similarity_score, full.similarity_score);

        let two = run(&family, SlotOptions { max_slots: Some(2), ..Default::default() });
        // cornerRadius and layoutMode both have 2 states; cornerRadius appears first.
        assert!(two.slots.contains_key("cornerRadius"));
        assert!(!two.slots.contains_key("layoutMode"));

        let zero = run(&family, SlotOptions { max_slots: Some(0), ..Default::default() });
        assert!(zero.slots.is_empty());
    }

    #[test]
    fn min_similarity_tolerates_minor_disagreement() {
        let family = [
            chip("1", "A", json!({})),
            chip("2", "A", json!({})),
            chip("3", "A", json!({})),
            chip("4", "B", json!({})),
        ];
        let strict = run(&family, SlotOptions::default());
        assert_eq!(strict.slots.len(), 1);

        let lenient = run(&family, SlotOptions { min_similarity: 0.7, ..Default::default() });
        assert!(lenient.slots.is_empty());
        assert_eq!(lenient.matching_paths, strict.matching_paths);
    }

    #[test]
    fn depth_bound_compares_children_as_opaque_values() {
        let family = [chip("1", "A", json!({})), chip("2", "B", json!({}))];
        let result = run(&family, SlotOptions { max_depth: Some(0), ..Default::default() });

        assert!(!result.slots.contains_key("children[0].text"));
        let slot = &result.slots["children[0]"];
        assert_eq!(slot.value_type, ValueType::Property);
        assert_eq!(slot.variations["2"]["text"], json!("B"));
        assert_eq!(slot.semantic_name, "labelContent");
        // The icon subtree differs only by ids, so it matches.
        assert!(!result.slots.contains_key("children[1]"));
    }

    #[test]
    fn missing_children_add_a_presence_row() {
        let mut short = chip("2", "A", json!({}));
        if let Some(children) = short.children.as_mut() {
            children.pop();
        }
        let result = run(&[chip("1", "A", json!({})), short], SlotOptions::default());

        let slot = &result.slots["children[1]"];
        assert_eq!(slot.value_type, ValueType::Property);
        assert_eq!(slot.default_value["name"], json!("Icon"));
        assert_eq!(slot.variations["2"], Value::Null);
        assert_eq!(slot.instance_count, 1);
        assert!(result.slots.contains_key("children[1].visible"));

        let full = run(&[chip("1", "A", json!({})), chip("2", "A", json!({}))], SlotOptions::default());
        assert!(full.slots.is_empty());
        assert_eq!(full.matching_paths, full.total_paths);
    }

    #[test]
    fn repeated_ids_get_positional_labels() {
        let family = [chip("x", "A", json!({})), chip("x", "B", json!({}))];
        let result = run(&family, SlotOptions::default());
        let labels: Vec<&String> = result.slots["children[0].text"].variations.keys().collect();
        assert_eq!(labels, vec!["x", "x#1"]);
    }

    #[test]
    fn generated_labels_never_collide_with_real_ids() {
        let cases: Vec<(Vec<&str>, Vec<&str>)> = vec![
            (vec!["x", "x", "x#1"], vec!["x", "x#1", "x#1#2"]),
            (vec!["x#1", "x", "x"], vec!["x#1", "x", "x#2"]),
            (vec!["", "#0", ""], vec!["#0", "#0#1", "#2"]),
        ];

        for (ids, expected) in cases {
            let family: Vec<Node> =
                ids.iter().enumerate().map(|(i, id)| chip(id, &i.to_string(), json!({}))).collect();
            let refs: Vec<&Node> = family.iter().collect();
            assert_eq!(instance_labels(&refs), expected, "ids {ids:?}");

            let result = run(&family, SlotOptions::default());
            assert_eq!(result.slots["children[0].text"].variations.len(), ids.len(), "ids {ids:?}");
        }
    }
}
