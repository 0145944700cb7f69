use crate::engine::{self, CompiledSlotOptions, ComponentDefinition, ComponentInventory, CompressionStats};
use crate::engine::{FamilyReport, RunMetrics, SlotDetectionResult};
use crate::error::{Error, Result};
use crate::node::{Node, OutputNode};
use crate::value_type::ValueType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::time::Duration;

/// How slots get their human-readable `semanticName`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotNaming {
    /// Derive a camelCase label from the enclosing node name and the field.
    #[default]
    Heuristic,
    /// Use the canonical path as the name.
    Disabled,
}

/// Options that control slot detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlotOptions {
    /// Fraction of instances that must agree on a path for it to be shared.
    /// `1.0` turns any disagreement into a slot.
    pub min_similarity: f64,
    /// Value types reported as slots even where every instance agrees.
    pub always_slots: Vec<ValueType>,
    /// Value types never reported as slots.
    pub never_slots: Vec<ValueType>,
    /// Keep at most this many slots, most varied first.
    pub max_slots: Option<usize>,
    /// Node depth below the instance root past which children are compared whole.
    pub max_depth: Option<usize>,
    pub slot_naming: SlotNaming,
}

impl Default for SlotOptions {
    fn default() -> Self {
        SlotOptions {
            min_similarity: 1.0,
            always_slots: Vec::new(),
            never_slots: Vec::new(),
            max_slots: None,
            max_depth: None,
            slot_naming: SlotNaming::default(),
        }
    }
}

/// Options for a full extraction pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractOptions {
    /// Minimum number of instances for a component to be considered.
    pub min_instances: usize,
    #[serde(flatten)]
    pub slots: SlotOptions,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions { min_instances: 2, slots: SlotOptions::default() }
    }
}

impl ExtractOptions {
    /// Parse options from a JSON object and validate them.
    ///
    /// Missing keys take their defaults.
    ///
    /// # Example
    /// ```
    /// use stencil::ExtractOptions;
    ///
    /// let options = ExtractOptions::from_json(r#"{"minInstances": 3, "neverSlots": ["opacity"]}"#).unwrap();
    /// assert_eq!(options.min_instances, 3);
    /// assert_eq!(options.slots.min_similarity, 1.0);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let options: ExtractOptions = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reject values the core would otherwise silently clamp.
    pub fn validate(&self) -> Result<()> {
        if self.min_instances < 1 {
            return Err(Error::InvalidOption { name: "minInstances", reason: "must be at least 1".into() });
        }
        let similarity = self.slots.min_similarity;
        if !similarity.is_finite() || !(0.0..=1.0).contains(&similarity) {
            return Err(Error::InvalidOption {
                name: "minSimilarity",
                reason: format!("{} is outside 0..=1", similarity),
            });
        }
        if let Some(both) = self.slots.always_slots.iter().find(|vt| self.slots.never_slots.contains(vt)) {
            return Err(Error::InvalidOption {
                name: "alwaysSlots",
                reason: format!("`{}` is also listed in neverSlots", both),
            });
        }
        Ok(())
    }
}

/// Result from [`extract_components`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResult {
    /// Document name, passed through.
    pub name: String,
    pub tree: OutputNode,
    /// Component id → definition, for every compressed family.
    pub components: BTreeMap<String, ComponentDefinition>,
    /// Passed through untouched.
    pub global_styles: Map<String, Value>,
    pub stats: CompressionStats,
}

/// Additional details returned by [`extract_components_verbose`].
#[derive(Debug, Clone)]
pub struct ExtractDetails {
    /// One entry per qualifying family, in processing order.
    pub families: Vec<FamilyReport>,
    pub inventory: ComponentInventory,
    pub metrics: RunMetrics,
}

/// Result from [`extract_components_verbose`].
#[derive(Debug, Clone)]
pub struct ExtractResultVerbose {
    pub result: ExtractResult,
    pub elapsed: Duration,
    pub details: ExtractDetails,
}

/// Compare a family of instances and report the locations that vary.
///
/// The first instance is the template candidate: its values become the slot
/// defaults. Fewer than two instances yield no slots and a similarity of 1.
pub fn detect_slots<N: Borrow<Node>>(instances: &[N], options: &SlotOptions) -> SlotDetectionResult {
    let refs: Vec<&Node> = instances.iter().map(|n| <N as Borrow<Node>>::borrow(n)).collect();
    engine::detect(&refs, &CompiledSlotOptions::new(options))
}

/// Group the instances of `tree` by component id, keeping the families that
/// occur at least `min_instances` times.
pub fn analyze_components(tree: &Node, min_instances: usize) -> ComponentInventory {
    engine::analyze(tree, min_instances)
}

/// Replace repeated component instances with a shared template plus compact
/// per-instance overrides.
///
/// Families that would not get smaller, or could not be rebuilt exactly from
/// their overrides, stay inline.
///
/// # Example
/// ```
/// use stencil::{ExtractOptions, Node, extract_components};
///
/// let tree: Node = serde_json::from_str(r#"{"id": "0:1", "name": "Page", "type": "CANVAS"}"#).unwrap();
/// let out = extract_components("Doc", &tree, Default::default(), &ExtractOptions::default());
/// assert!(out.components.is_empty());
/// assert_eq!(out.stats.reduction_percent, 0.0);
/// ```
pub fn extract_components(
    name: &str,
    tree: &Node,
    global_styles: Map<String, Value>,
    options: &ExtractOptions,
) -> ExtractResult {
    extract_components_verbose(name, tree, global_styles, options).result
}

/// Like [`extract_components`], also returning per-family decisions and phase timings.
pub fn extract_components_verbose(
    name: &str,
    tree: &Node,
    global_styles: Map<String, Value>,
    options: &ExtractOptions,
) -> ExtractResultVerbose {
    let compiled = CompiledSlotOptions::new(&options.slots);
    let run = engine::extract(tree, options.min_instances, &compiled);

    ExtractResultVerbose {
        result: ExtractResult {
            name: name.to_string(),
            tree: run.tree,
            components: run.components,
            global_styles,
            stats: run.stats,
        },
        elapsed: run.metrics.total,
        details: ExtractDetails { families: run.reports, inventory: run.inventory, metrics: run.metrics },
    }
}

/// Expand every compact reference in `tree` back into a full node.
///
/// Descendant ids of restored instances come from the template; the instance
/// root keeps its own id.
pub fn restore_tree(tree: &OutputNode, components: &BTreeMap<String, ComponentDefinition>) -> Result<Node> {
    match tree {
        OutputNode::Instance(reference) => {
            let definition = components
                .get(&reference.component_id)
                .ok_or_else(|| Error::UnknownComponent(reference.component_id.clone(), reference.id.clone()))?;
            let mut node = engine::apply_overrides(&definition.template, &reference.overrides);
            node.id = reference.id.clone();
            Ok(node)
        }
        OutputNode::Node(inline) => {
            let children = match &inline.children {
                Some(children) => {
                    Some(children.iter().map(|child| restore_tree(child, components)).collect::<Result<Vec<_>>>()?)
                }
                None => None,
            };
            Ok(Node {
                id: inline.id.clone(),
                name: inline.name.clone(),
                node_type: inline.node_type.clone(),
                component_id: inline.component_id.clone(),
                attrs: inline.attrs.clone(),
                children,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn card(id: &str, title: &str) -> Value {
        json!({
            "id": id, "name": "Card", "type": "INSTANCE", "componentId": "card",
            "cornerRadius": 12, "fills": [{"type": "SOLID", "color": "#ffffff"}],
            "children": [
                {"id": format!("{id}:t"), "name": "Title", "type": "TEXT", "text": title,
                 "fills": [{"type": "SOLID", "color": "#111111"}]},
                {"id": format!("{id}:b"), "name": "Body", "type": "TEXT",
                 "text": "Shared body copy that every card repeats verbatim."}
            ]
        })
    }

    fn page() -> Node {
        serde_json::from_value(json!({
            "id": "0:1", "name": "Page", "type": "CANVAS",
            "children": [card("1", "Alpha"), card("2", "Beta"), card("3", "Gamma")]
        }))
        .unwrap()
    }

    #[test]
    fn extract_components_compresses_and_restores() {
        let tree = page();
        let styles = Map::from_iter([("primary".to_string(), json!("#0055ff"))]);
        let out = extract_components("Doc", &tree, styles.clone(), &ExtractOptions::default());

        assert_eq!(out.name, "Doc");
        assert_eq!(out.global_styles, styles);
        assert_eq!(out.stats.component_count, 1);
        assert_eq!(out.stats.instance_count, 3);
        assert!(out.stats.compressed_size < out.stats.original_size);

        let definition = &out.components["card"];
        assert_eq!(definition.detection.slot_paths().collect::<Vec<_>>(), vec!["children[0].text"]);

        let restored = restore_tree(&out.tree, &out.components).unwrap();
        assert!(restored.eq_ignoring_ids(&tree));
        let ids: Vec<&str> = restored.child_nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn verbose_includes_reports_and_metrics() {
        let res = extract_components_verbose("Doc", &page(), Map::new(), &ExtractOptions::default());

        assert_eq!(res.elapsed, res.details.metrics.total);
        assert!(res.details.metrics.inventory <= res.details.metrics.total);
        assert_eq!(res.details.families.len(), 1);
        assert_eq!(res.details.families[0].outcome, engine::FamilyOutcome::Compressed);
        assert_eq!(res.details.inventory.families.len(), 1);
    }

    #[test]
    fn restore_rejects_unknown_components() {
        let out = extract_components("Doc", &page(), Map::new(), &ExtractOptions::default());
        let err = restore_tree(&out.tree, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, Error::UnknownComponent(ref c, ref i) if c == "card" && i == "1"));
    }

    #[test]
    fn options_from_json_fill_defaults() {
        let options = ExtractOptions::from_json(
            r#"{"minSimilarity": 0.5, "alwaysSlots": ["text"], "maxDepth": 2, "slotNaming": "disabled"}"#,
        )
        .unwrap();

        assert_eq!(options.min_instances, 2);
        assert_eq!(options.slots.min_similarity, 0.5);
        assert_eq!(options.slots.always_slots, vec![ValueType::Text]);
        assert_eq!(options.slots.max_depth, Some(2));
        assert_eq!(options.slots.slot_naming, SlotNaming::Disabled);
        assert_eq!(ExtractOptions::from_json("{}").unwrap(), ExtractOptions::default());
    }

    #[test]
    fn options_validation_rejects_out_of_range_values() {
        let cases = [
            r#"{"minInstances": 0}"#,
            r#"{"minSimilarity": 1.5}"#,
            r#"{"minSimilarity": -0.1}"#,
            r#"{"alwaysSlots": ["fills"], "neverSlots": ["fills"]}"#,
        ];
        for case in cases {
            assert!(matches!(ExtractOptions::from_json(case), Err(Error::InvalidOption { .. })), "{case}");
        }
        assert!(matches!(ExtractOptions::from_json(r#"{"neverSlots": ["colour"]}"#), Err(Error::Config(_))));
    }

    #[test]
    fn detect_slots_accepts_owned_and_borrowed_nodes() {
        let a: Node = serde_json::from_value(card("1", "Alpha")).unwrap();
        let b: Node = serde_json::from_value(card("2", "Beta")).unwrap();

        let owned = detect_slots(&[a.clone(), b.clone()], &SlotOptions::default());
        let borrowed = detect_slots(&[&a, &b], &SlotOptions::default());
        assert_eq!(owned, borrowed);
        assert_eq!(owned.slot_count(), 1);
    }
}
