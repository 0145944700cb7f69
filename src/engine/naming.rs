//! Advisory slot naming.
//!
//! Slot names are a convenience for downstream readers ("buttonLabelText"
//! reads better than "children[1].children[0].text"). They are never used as
//! keys and nothing correctness-critical depends on them, so the strategy is
//! isolated here and can be switched off with [`SlotNaming::Disabled`].
//!
//! ```text
//! node "Primary Button" + text     -> primaryButtonText
//! node "Icon/Left"      + visible  -> iconLeftVisible
//! node "Label Text"     + text     -> labelText          (no repeated suffix)
//! node ""               + fills    -> fill
//! ```

use crate::{SlotNaming, ValueType};

/// Name a slot according to the configured strategy.
pub(crate) fn name_slot(
    naming: SlotNaming,
    canonical: &str,
    node_name: &str,
    value_type: ValueType,
    field: Option<&str>,
) -> String {
    match naming {
        SlotNaming::Heuristic => semantic_name(node_name, value_type, field),
        SlotNaming::Disabled => canonical.to_string(),
    }
}

/// Heuristic camelCase name from the enclosing node name and the value kind.
pub fn semantic_name(node_name: &str, value_type: ValueType, field: Option<&str>) -> String {
    let suffix = suffix_for(value_type, field);
    let mut words: Vec<&str> = crate::regex!(r"[A-Za-z0-9]+").find_iter(node_name).map(|m| m.as_str()).collect();

    if words.last().is_some_and(|w| w.eq_ignore_ascii_case(&suffix)) {
        words.pop();
    }

    let mut name = String::new();
    for word in words.iter().copied().chain(std::iter::once(suffix.as_str())) {
        if name.is_empty() {
            name.push_str(&lower_first(word));
        } else {
            name.push_str(&upper_first(word));
        }
    }
    name
}

fn suffix_for(value_type: ValueType, field: Option<&str>) -> String {
    match value_type {
        ValueType::Text => "Text".to_string(),
        ValueType::Fills => "Fill".to_string(),
        ValueType::Strokes => "Stroke".to_string(),
        ValueType::Opacity => "Opacity".to_string(),
        ValueType::Visibility => "Visible".to_string(),
        ValueType::Property => match field {
            Some(field) => upper_first(field),
            None => "Content".to_string(),
        },
    }
}

fn upper_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lower_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
