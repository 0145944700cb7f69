//! Addressable probes and value equality.
//!
//! A [`Probe`] is one addressable location within an instance, plus the rule
//! for reading and comparing the value found there. Probes come in two kinds:
//!
//! ```text
//! children[0].text     Attribute { Text, "text" }   per-category equality
//! children[0].radius   Attribute { Property, … }    structural JSON equality
//! children[2]          Subtree                      whole child, ids ignored
//! children[2]          Presence                     whether the child exists
//! ```
//!
//! Subtree probes only appear below the detector's depth bound, where a child
//! is compared as one opaque value instead of being addressed field by field.
//! Above the bound, a child missing from some instances gets a presence probe;
//! its content is still compared field by field.
//!
//! ## What counts as "the same value"
//!
//! - Absence only equals absence.
//! - Attributes defer to [`ValueType::values_equal`].
//! - Subtrees use [`Node::eq_ignoring_ids`]: descendants of distinct instances
//!   always carry distinct ids, so comparing them would make every subtree vary.

use crate::ValueType;
use crate::node::Node;
use crate::path::{CHILDREN, Path, Step};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ProbeKind {
    Attribute { value_type: ValueType, field: String },
    Subtree,
    Presence,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Probe {
    /// Location of the node that owns the value (or of the subtree itself).
    pub owner: Path,
    pub path: Path,
    pub canonical: String,
    pub kind: ProbeKind,
}

/// A value observed through a probe.
#[derive(Debug, Clone)]
pub(crate) enum Sample<'a> {
    Value(Value),
    Subtree(&'a Node),
}

impl Sample<'_> {
    pub fn to_value(&self) -> Value {
        match self {
            Sample::Value(v) => v.clone(),
            Sample::Subtree(node) => serde_json::to_value(node).unwrap_or(Value::Null),
        }
    }
}

impl Probe {
    pub fn attribute(owner: &Path, value_type: ValueType, field: &str) -> Probe {
        let path = owner.field(field);
        let canonical = path.to_string();
        Probe {
            owner: owner.clone(),
            path,
            canonical,
            kind: ProbeKind::Attribute { value_type, field: field.to_string() },
        }
    }

    pub fn subtree(path: Path) -> Probe {
        let canonical = path.to_string();
        Probe { owner: path.clone(), path, canonical, kind: ProbeKind::Subtree }
    }

    pub fn presence(path: Path) -> Probe {
        let canonical = path.to_string();
        Probe { owner: path.clone(), path, canonical, kind: ProbeKind::Presence }
    }

    /// True for probes that address a whole child.
    pub fn is_child(&self) -> bool {
        matches!(self.kind, ProbeKind::Subtree | ProbeKind::Presence)
    }

    /// Rebuild the probe for a canonical path string.
    ///
    /// Returns `None` for paths that do not name a node attribute or a child,
    /// e.g. paths reaching inside a JSON attribute value.
    pub fn from_path(path: &Path) -> Option<Probe> {
        let steps = path.steps();
        match steps.split_last() {
            Some((Step::Index(_), _)) if is_node_path(steps) => Some(Probe::subtree(path.clone())),
            Some((Step::Field(field), owner)) if field != CHILDREN && is_node_path(owner) => {
                let owner = Path::from_steps(owner.to_vec());
                Some(Probe::attribute(&owner, ValueType::of_field(field), field))
            }
            _ => None,
        }
    }

    pub fn value_type(&self) -> ValueType {
        match &self.kind {
            ProbeKind::Attribute { value_type, .. } => *value_type,
            ProbeKind::Subtree | ProbeKind::Presence => ValueType::Property,
        }
    }

    /// Terminal field name (`None` for child probes).
    pub fn field(&self) -> Option<&str> {
        match &self.kind {
            ProbeKind::Attribute { field, .. } => Some(field),
            ProbeKind::Subtree | ProbeKind::Presence => None,
        }
    }

    pub fn read<'a>(&self, instance: &'a Node) -> Option<Sample<'a>> {
        let node = instance.descendant(&self.owner)?;
        match &self.kind {
            ProbeKind::Attribute { value_type, field } => value_type.read(node, field).map(Sample::Value),
            ProbeKind::Subtree | ProbeKind::Presence => Some(Sample::Subtree(node)),
        }
    }

    pub fn same(&self, a: Option<&Sample<'_>>, b: Option<&Sample<'_>>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(_), Some(_)) if self.kind == ProbeKind::Presence => true,
            (Some(Sample::Subtree(x)), Some(Sample::Subtree(y))) => x.eq_ignoring_ids(y),
            (Some(Sample::Value(x)), Some(Sample::Value(y))) => self.value_type().values_equal(Some(x), Some(y)),
            _ => false,
        }
    }
}

/// True when `steps` is a (possibly empty) chain of `children[i]` pairs.
fn is_node_path(steps: &[Step]) -> bool {
    steps.len() % 2 == 0
        && steps.chunks(2).all(|pair| matches!(pair, [Step::Field(f), Step::Index(_)] if f == CHILDREN))
}
