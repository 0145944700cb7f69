//! Override application and derivation.
//!
//! An override record is a sparse `canonical path → value` map for one
//! instance. Applying it to the family template rebuilds that instance:
//!
//! ```text
//! template ──clone──▶ node ──for each (path, value)──▶ set_at(node, steps, value)
//!                                   │
//!                                   ├─ children[i] … ─▶ descend into child i
//!                                   ├─ children[i]   ─▶ replace child i, append at i == len,
//!                                   │                   remove on null
//!                                   ├─ field         ─▶ ValueType::write (null clears)
//!                                   └─ field.… ─────▶ edit inside the JSON value
//! ```
//!
//! Edits run in path order (indices numerically). Child removals run after
//! everything else, highest path first, so no removal shifts a sibling that
//! another edit still addresses.
//!
//! Paths that do not resolve against the template are skipped; a partial
//! reconstruction is more useful than none.

use super::probe::{Probe, Sample};
use super::slots::SlotDetectionResult;
use crate::node::Node;
use crate::path::{CHILDREN, Path, Step};
use crate::{Overrides, ValueType};
use serde_json::Value;

/// Build a new node equal to `template` with every resolvable override applied.
pub fn apply_overrides(template: &Node, overrides: &Overrides) -> Node {
    let (mut removals, mut edits): (Vec<_>, Vec<_>) = overrides
        .iter()
        .map(|(raw, value)| (Path::parse(raw), raw, value))
        .partition(|(path, _, value)| value.is_null() && is_child_path(path));
    edits.sort_by(|a, b| a.0.cmp(&b.0));
    removals.sort_by(|a, b| b.0.cmp(&a.0));

    let mut node = template.clone();
    for (path, raw, value) in edits.into_iter().chain(removals) {
        if !set_at(&mut node, path.steps(), value.clone()) {
            log::debug!("[overrides] ignoring unresolved path `{}` on template `{}`", raw, template.id);
        }
    }
    node
}

/// Override record for `instance`: one entry per detected slot whose value in
/// `instance` differs from the template's. Absent values are written as `null`.
///
/// A child present on only one side travels whole (or as `null`), and nothing
/// beneath it is recorded. A child present on both sides travels whole only
/// when no slot addresses its inside.
pub fn derive_overrides(template: &Node, instance: &Node, detection: &SlotDetectionResult) -> Overrides {
    let mut overrides = Overrides::new();
    // "children[i]." prefixes of children that were added or removed.
    let mut whole: Vec<String> = Vec::new();

    for slot in detection.slots.values() {
        let Some(probe) = Probe::from_path(&Path::parse(&slot.node_path)) else {
            continue;
        };
        let expected = probe.read(template);
        let actual = probe.read(instance);
        if probe.same(expected.as_ref(), actual.as_ref()) {
            continue;
        }
        if probe.is_child() {
            let prefix = format!("{}.", slot.node_path);
            if expected.is_some() != actual.is_some() {
                whole.push(prefix);
            } else if detection.slots.keys().any(|key| key.starts_with(&prefix)) {
                continue;
            }
        }
        overrides.insert(slot.node_path.clone(), actual.as_ref().map(Sample::to_value).unwrap_or(Value::Null));
    }

    overrides.retain(|path, _| !whole.iter().any(|prefix| path.starts_with(prefix.as_str())));
    overrides
}

fn is_child_path(path: &Path) -> bool {
    matches!(path.steps(), [.., Step::Field(field), Step::Index(_)] if field == CHILDREN)
}

fn set_at(node: &mut Node, steps: &[Step], value: Value) -> bool {
    match steps {
        [Step::Field(field), Step::Index(i)] if field == CHILDREN => set_child(node, *i, value),
        [Step::Field(field), Step::Index(i), rest @ ..] if field == CHILDREN => {
            match node.children.as_mut().and_then(|children| children.get_mut(*i)) {
                Some(child) => set_at(child, rest, value),
                None => false,
            }
        }
        [Step::Field(field), ..] if field == CHILDREN => false,
        [Step::Field(field)] => ValueType::of_field(field).write(node, field, value),
        [Step::Field(field), rest @ ..] => {
            let value_type = ValueType::of_field(field);
            let Some(mut current) = value_type.read(node, field) else {
                return false;
            };
            set_within(&mut current, rest, value) && value_type.write(node, field, current)
        }
        _ => false,
    }
}

/// Replace child `i`, append it when `i` is one past the end, or remove it
/// when `value` is `null`.
fn set_child(node: &mut Node, i: usize, value: Value) -> bool {
    let len = node.child_nodes().len();
    if value.is_null() {
        return match node.children.as_mut() {
            Some(children) if i < len => {
                children.remove(i);
                true
            }
            _ => false,
        };
    }
    if i > len {
        return false;
    }
    let Ok(child) = serde_json::from_value::<Node>(value) else {
        return false;
    };
    let children = node.children.get_or_insert_with(Vec::new);
    match children.get_mut(i) {
        Some(slot) => *slot = child,
        None => children.push(child),
    }
    true
}

/// Set `value` at `steps` inside a JSON value. The last step may add a new key
/// to an existing object (or remove it, for `null`); every other step must
/// already resolve.
fn set_within(target: &mut Value, steps: &[Step], value: Value) -> bool {
    match steps {
        [] => {
            *target = value;
            true
        }
        [Step::Field(key)] => match target.as_object_mut() {
            Some(map) if value.is_null() => map.remove(key).is_some(),
            Some(map) => {
                map.insert(key.clone(), value);
                true
            }
            None => false,
        },
        [Step::Field(key), rest @ ..] => match target.get_mut(key.as_str()) {
            Some(inner) => set_within(inner, rest, value),
            None => false,
        },
        [Step::Index(i), rest @ ..] => match target.get_mut(*i) {
            Some(inner) => set_within(inner, rest, value),
            None => false,
        },
    }
}
