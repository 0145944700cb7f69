//! Node tree data model.
//!
//! Input trees are produced by an external provider and treated as
//! immutable: every transform in this crate builds new values.
//!
//! ```text
//! Node ── attrs: Attributes (text, fills, strokes, opacity, visible, properties…)
//!     └─ children: [Node, Node, …]            (exclusively owned, acyclic)
//!
//! OutputNode ─┬─ Instance(InstanceRef)        {id, componentId, overrides}
//!             └─ Node(CompactNode)            same attrs, children: [OutputNode]
//! ```
//!
//! On the wire the attribute fields and free-form properties are flattened
//! into the node object, so a node reads like the provider's JSON.

use crate::Overrides;
use crate::path::{CHILDREN, Path, Step};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// --- Input tree --------------------------------------------------------------

/// Typed content/visual attributes shared by input and output nodes.
///
/// A free-form property whose value is `null` reads as absent: it is dropped
/// on deserialization, so `null` always means "no value" at any path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawAttributes")]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Fill paint descriptors, in paint order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fills: Option<Vec<Value>>,
    /// Stroke paint descriptors, in paint order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strokes: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// Any other named property (corner radius, layout mode, …).
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAttributes {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    fills: Option<Vec<Value>>,
    #[serde(default)]
    strokes: Option<Vec<Value>>,
    #[serde(default)]
    opacity: Option<f64>,
    #[serde(default)]
    visible: Option<bool>,
    #[serde(flatten)]
    properties: BTreeMap<String, Value>,
}

impl From<RawAttributes> for Attributes {
    fn from(raw: RawAttributes) -> Self {
        Attributes {
            text: raw.text,
            fills: raw.fills,
            strokes: raw.strokes,
            opacity: raw.opacity,
            visible: raw.visible,
            properties: raw.properties.into_iter().filter(|(_, value)| !value.is_null()).collect(),
        }
    }
}

/// One node of a design document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    /// Present when the node is an instance of a reusable component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    #[serde(flatten)]
    pub attrs: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: impl Into<String>) -> Self {
        Node { id: id.into(), name: name.into(), node_type: node_type.into(), ..Default::default() }
    }

    /// Children as a slice (empty when the node has none).
    pub fn child_nodes(&self) -> &[Node] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Resolve a node path made of `children[i]` pairs.
    ///
    /// Returns `None` for paths that contain any other step or that walk off
    /// the tree.
    pub fn descendant(&self, path: &Path) -> Option<&Node> {
        let mut node = self;
        let mut steps = path.steps().iter();
        while let Some(step) = steps.next() {
            match (step, steps.next()) {
                (Step::Field(field), Some(Step::Index(i))) if field == CHILDREN => {
                    node = node.child_nodes().get(*i)?;
                }
                _ => return None,
            }
        }
        Some(node)
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.child_nodes());
        }
        count
    }

    /// Structural equality that ignores `id` at every level.
    ///
    /// Instances of one component carry distinct ids for every descendant, so
    /// ids are identity rather than content.
    pub fn eq_ignoring_ids(&self, other: &Node) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((a, b)) = stack.pop() {
            if a.name != b.name || a.node_type != b.node_type || a.component_id != b.component_id || a.attrs != b.attrs
            {
                return false;
            }
            match (&a.children, &b.children) {
                (None, None) => {}
                (Some(ca), Some(cb)) if ca.len() == cb.len() => stack.extend(ca.iter().zip(cb.iter())),
                _ => return false,
            }
        }
        true
    }
}

// --- Output tree -------------------------------------------------------------

/// Compact record that replaces a compressed instance in the output tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InstanceRef {
    pub id: String,
    pub component_id: String,
    pub overrides: Overrides,
}

/// An inline node of the output tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactNode {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<String>,
    #[serde(flatten)]
    pub attrs: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<OutputNode>>,
}

/// A node of the rewritten tree: either a compact reference or an inline node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputNode {
    Instance(InstanceRef),
    Node(CompactNode),
}

impl OutputNode {
    /// Wrap a full input node without compressing anything inside it.
    pub fn inline(node: &Node) -> OutputNode {
        OutputNode::Node(CompactNode {
            id: node.id.clone(),
            name: node.name.clone(),
            node_type: node.node_type.clone(),
            component_id: node.component_id.clone(),
            attrs: node.attrs.clone(),
            children: node.children.as_ref().map(|cs| cs.iter().map(OutputNode::inline).collect()),
        })
    }

    pub fn id(&self) -> &str {
        match self {
            OutputNode::Instance(r) => &r.id,
            OutputNode::Node(n) => &n.id,
        }
    }

    pub fn as_instance(&self) -> Option<&InstanceRef> {
        match self {
            OutputNode::Instance(r) => Some(r),
            OutputNode::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&CompactNode> {
        match self {
            OutputNode::Node(n) => Some(n),
            OutputNode::Instance(_) => None,
        }
    }
}
