//! Comparable attribute categories.
//!
//! Every addressable value in a node belongs to exactly one [`ValueType`].
//! Each variant owns three strategies:
//!
//! - **read**: pull the value out of a node as JSON (`None` = absent)
//! - **write**: put a JSON value back into a node (`null` clears it)
//! - **equality**: decide whether two observed states are the same
//!
//! Adding a category means adding a variant and its arms here; the detector
//! and the applier only ever go through these methods.

use crate::node::Node;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Category of an addressable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Text,
    Fills,
    Strokes,
    Opacity,
    Visibility,
    /// Fallback for every other scalar field, and for opaque subtrees.
    Property,
}

/// Node fields never compared: identity, not content.
const IDENTITY_FIELDS: &[&str] = &["id"];

/// Scalar fields that live on the node itself rather than in `properties`.
const NODE_SCALARS: &[&str] = &["name", "type", "componentId"];

impl ValueType {
    pub const ALL: [ValueType; 6] = [
        ValueType::Text,
        ValueType::Fills,
        ValueType::Strokes,
        ValueType::Opacity,
        ValueType::Visibility,
        ValueType::Property,
    ];

    /// Categories with a dedicated node field, in enumeration order.
    pub const TRACKED: [ValueType; 5] =
        [ValueType::Text, ValueType::Fills, ValueType::Strokes, ValueType::Opacity, ValueType::Visibility];

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Text => "text",
            ValueType::Fills => "fills",
            ValueType::Strokes => "strokes",
            ValueType::Opacity => "opacity",
            ValueType::Visibility => "visibility",
            ValueType::Property => "property",
        }
    }

    pub fn from_name(name: &str) -> Option<ValueType> {
        ValueType::ALL.into_iter().find(|vt| vt.name() == name)
    }

    /// The JSON field a tracked category is stored under.
    pub fn field(self) -> Option<&'static str> {
        match self {
            ValueType::Text => Some("text"),
            ValueType::Fills => Some("fills"),
            ValueType::Strokes => Some("strokes"),
            ValueType::Opacity => Some("opacity"),
            ValueType::Visibility => Some("visible"),
            ValueType::Property => None,
        }
    }

    /// Classify a node field name.
    pub fn of_field(field: &str) -> ValueType {
        ValueType::TRACKED.into_iter().find(|vt| vt.field() == Some(field)).unwrap_or(ValueType::Property)
    }

    /// Read `field` (of this category) from `node`.
    pub fn read(self, node: &Node, field: &str) -> Option<Value> {
        let attrs = &node.attrs;
        match self {
            ValueType::Text => attrs.text.clone().map(Value::String),
            ValueType::Fills => attrs.fills.clone().map(Value::Array),
            ValueType::Strokes => attrs.strokes.clone().map(Value::Array),
            ValueType::Opacity => attrs.opacity.and_then(serde_json::Number::from_f64).map(Value::Number),
            ValueType::Visibility => attrs.visible.map(Value::Bool),
            ValueType::Property => match field {
                "name" => Some(Value::String(node.name.clone())),
                "type" => Some(Value::String(node.node_type.clone())),
                "componentId" => node.component_id.clone().map(Value::String),
                "id" => Some(Value::String(node.id.clone())),
                _ => attrs.properties.get(field).cloned(),
            },
        }
    }

    /// Write `value` into `field` of `node`. `null` clears optional fields.
    ///
    /// Returns `false` when the value does not fit the category (e.g. a string
    /// written to `opacity`); the node is left untouched in that case.
    pub fn write(self, node: &mut Node, field: &str, value: Value) -> bool {
        let attrs = &mut node.attrs;
        match (self, value) {
            (ValueType::Text, Value::Null) => attrs.text = None,
            (ValueType::Text, Value::String(s)) => attrs.text = Some(s),
            (ValueType::Fills, Value::Null) => attrs.fills = None,
            (ValueType::Fills, Value::Array(v)) => attrs.fills = Some(v),
            (ValueType::Strokes, Value::Null) => attrs.strokes = None,
            (ValueType::Strokes, Value::Array(v)) => attrs.strokes = Some(v),
            (ValueType::Opacity, Value::Null) => attrs.opacity = None,
            (ValueType::Opacity, Value::Number(n)) => match n.as_f64() {
                Some(f) => attrs.opacity = Some(f),
                None => return false,
            },
            (ValueType::Visibility, Value::Null) => attrs.visible = None,
            (ValueType::Visibility, Value::Bool(b)) => attrs.visible = Some(b),
            (ValueType::Property, value) => return write_property(node, field, value),
            _ => return false,
        }
        true
    }

    /// Category-specific equality of two observed states (`None` = absent).
    ///
    /// Absence only equals absence. Opacity compares numerically so `1` and
    /// `1.0` agree; everything else is structural JSON equality.
    pub fn values_equal(self, a: Option<&Value>, b: Option<&Value>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => match self {
                ValueType::Opacity => match (a.as_f64(), b.as_f64()) {
                    (Some(x), Some(y)) => x == y,
                    _ => a == b,
                },
                _ => a == b,
            },
            _ => false,
        }
    }

    /// Fields of `node` addressable in this category, in a stable order.
    pub fn fields(self, node: &Node) -> Vec<String> {
        match self {
            ValueType::Property => {
                let mut fields: Vec<String> = NODE_SCALARS
                    .iter()
                    .filter(|f| ValueType::Property.read(node, f).is_some())
                    .map(|f| f.to_string())
                    .collect();
                fields.extend(
                    node.attrs
                        .properties
                        .keys()
                        .filter(|k| !IDENTITY_FIELDS.contains(&k.as_str()) && !NODE_SCALARS.contains(&k.as_str()))
                        .cloned(),
                );
                fields
            }
            tracked => match tracked.field() {
                Some(field) if tracked.read(node, field).is_some() => vec![field.to_string()],
                _ => Vec::new(),
            },
        }
    }
}

fn write_property(node: &mut Node, field: &str, value: Value) -> bool {
    match (field, value) {
        ("id", Value::String(s)) => node.id = s,
        ("name", Value::String(s)) => node.name = s,
        ("type", Value::String(s)) => node.node_type = s,
        ("componentId", Value::String(s)) => node.component_id = Some(s),
        ("componentId", Value::Null) => node.component_id = None,
        ("id" | "name" | "type" | "componentId", _) => return false,
        (_, Value::Null) => {
            node.attrs.properties.remove(field);
        }
        (_, value) => {
            node.attrs.properties.insert(field.to_string(), value);
        }
    }
    true
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn button() -> Node {
        serde_json::from_value(json!({
            "id": "1:1", "name": "Button", "type": "INSTANCE", "componentId": "comp-1",
            "text": "Submit", "opacity": 0.5, "visible": true,
            "fills": [{"type": "SOLID", "color": "#00f"}],
            "cornerRadius": 4, "layoutMode": "HORIZONTAL"
        }))
        .unwrap()
    }

    #[test]
    fn classifies_fields() {
        assert_eq!(ValueType::of_field("text"), ValueType::Text);
        assert_eq!(ValueType::of_field("visible"), ValueType::Visibility);
        assert_eq!(ValueType::of_field("cornerRadius"), ValueType::Property);
        assert_eq!(ValueType::from_name("visibility"), Some(ValueType::Visibility));
        assert_eq!(ValueType::from_name("visible"), None);
    }

    #[test]
    fn reads_each_category() {
        let node = button();
        assert_eq!(ValueType::Text.read(&node, "text"), Some(json!("Submit")));
        assert_eq!(ValueType::Opacity.read(&node, "opacity"), Some(json!(0.5)));
        assert_eq!(ValueType::Fills.read(&node, "fills"), Some(json!([{"type": "SOLID", "color": "#00f"}])));
        assert_eq!(ValueType::Strokes.read(&node, "strokes"), None);
        assert_eq!(ValueType::Property.read(&node, "componentId"), Some(json!("comp-1")));
        assert_eq!(ValueType::Property.read(&node, "cornerRadius"), Some(json!(4)));
    }

    #[test]
    fn enumerates_property_fields_without_identity() {
        let node = button();
        assert_eq!(
            ValueType::Property.fields(&node),
            vec!["name", "type", "componentId", "cornerRadius", "layoutMode"]
        );
        assert_eq!(ValueType::Text.fields(&node), vec!["text"]);
        assert!(ValueType::Strokes.fields(&node).is_empty());
    }

    #[test]
    fn writes_and_clears() {
        let mut node = button();
        assert!(ValueType::Text.write(&mut node, "text", json!("Cancel")));
        assert!(ValueType::Visibility.write(&mut node, "visible", Value::Null));
        assert!(ValueType::Property.write(&mut node, "cornerRadius", Value::Null));
        assert!(!ValueType::Opacity.write(&mut node, "opacity", json!("opaque")));

        assert_eq!(node.attrs.text.as_deref(), Some("Cancel"));
        assert_eq!(node.attrs.visible, None);
        assert!(!node.attrs.properties.contains_key("cornerRadius"));
        assert_eq!(node.attrs.opacity, Some(0.5));
    }

    #[test]
    fn equality_per_category() {
        let one_int = json!(1);
        let one_float = json!(1.0);
        assert!(ValueType::Opacity.values_equal(Some(&one_int), Some(&one_float)));
        assert!(!ValueType::Property.values_equal(Some(&one_int), Some(&one_float)));
        assert!(ValueType::Text.values_equal(None, None));
        assert!(!ValueType::Text.values_equal(Some(&json!("")), None));
    }
}
