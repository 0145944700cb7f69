use proptest::prelude::*;
use serde_json::{Map, Value, json};
use stencil::{
    CompiledSlotOptions, ComponentFamily, ExtractOptions, FamilyOutcome, Node, SlotNaming, SlotOptions, ValueType,
    apply_overrides, detect_slots, extract_components, extract_components_verbose, restore_tree,
};

const LABELS: [&str; 4] = ["Submit", "Cancel", "Delete", "Archive"];
const COLORS: [&str; 3] = ["#0055ff", "#888888", "#ff0000"];

#[derive(Debug, Clone)]
struct Variant {
    label: usize,
    color: usize,
    icon_visible: bool,
    with_badge: bool,
}

fn arb_variant() -> impl Strategy<Value = Variant> {
    (0..LABELS.len(), 0..COLORS.len(), any::<bool>(), any::<bool>())
        .prop_map(|(label, color, icon_visible, with_badge)| Variant { label, color, icon_visible, with_badge })
}

fn button(idx: usize, v: &Variant) -> Value {
    let mut children = vec![
        json!({"id": format!("{idx}:1"), "name": "Label", "type": "TEXT", "text": LABELS[v.label], "fontSize": 14}),
        json!({"id": format!("{idx}:2"), "name": "Icon", "type": "VECTOR", "visible": v.icon_visible,
               "strokes": [{"type": "SOLID", "color": "#ffffff"}]}),
    ];
    if v.with_badge {
        children.push(json!({"id": format!("{idx}:3"), "name": "Badge", "type": "FRAME", "cornerRadius": 8,
                             "children": [{"id": format!("{idx}:4"), "name": "Count", "type": "TEXT", "text": "3"}]}));
    }
    json!({
        "id": format!("{idx}"), "name": "Button", "type": "INSTANCE", "componentId": "button",
        "cornerRadius": 6, "paddingLeft": 16, "paddingRight": 16,
        "fills": [{"type": "SOLID", "color": COLORS[v.color]}],
        "children": children
    })
}

fn tree_of(variants: &[Variant]) -> Node {
    let children: Vec<Value> = variants.iter().enumerate().map(|(idx, v)| button(idx + 1, v)).collect();
    serde_json::from_value(json!({"id": "0:0", "name": "Page", "type": "CANVAS", "children": children})).unwrap()
}

fn arb_slot_options() -> impl Strategy<Value = SlotOptions> {
    (
        prop_oneof![Just(1.0), 0.0..=1.0f64],
        proptest::option::of(0usize..4),
        proptest::option::of(0usize..3),
        any::<bool>(),
    )
        .prop_map(|(min_similarity, max_slots, max_depth, never_text)| SlotOptions {
            min_similarity,
            never_slots: if never_text { vec![ValueType::Text] } else { Vec::new() },
            max_slots,
            max_depth,
            slot_naming: SlotNaming::Heuristic,
            ..Default::default()
        })
}

#[test]
fn scenario_three_buttons() {
    let variants = [
        Variant { label: 0, color: 0, icon_visible: true, with_badge: false },
        Variant { label: 1, color: 1, icon_visible: true, with_badge: false },
        Variant { label: 2, color: 2, icon_visible: true, with_badge: false },
    ];
    let tree = tree_of(&variants);

    let out = extract_components("Buttons", &tree, Map::new(), &ExtractOptions::default());
    let definition = &out.components["button"];
    assert_eq!(definition.detection.slot_paths().collect::<Vec<_>>(), vec!["children[0].text", "fills"]);
    for slot in definition.detection.slots.values() {
        assert_eq!(slot.variations.len(), 3);
    }

    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["tree"]["children"][1]["componentId"], json!("button"));
    assert_eq!(json["tree"]["children"][1]["overrides"]["children[0].text"], json!("Cancel"));
    assert_eq!(json["components"]["button"]["slots"]["fills"]["valueType"], json!("fills"));
    assert!(json["stats"]["reductionPercent"].as_f64().unwrap() > 0.0);
}

#[test]
fn verbose_reports_every_family() {
    let variants = vec![Variant { label: 0, color: 0, icon_visible: true, with_badge: true }; 4];
    let res = extract_components_verbose("Doc", &tree_of(&variants), Map::new(), &ExtractOptions::default());

    assert_eq!(res.details.families.len(), 1);
    assert_eq!(res.details.families[0].outcome, FamilyOutcome::Compressed);
    assert_eq!(res.details.families[0].slot_count, 0);
    assert_eq!(res.result.stats.instance_count, 4);
}

#[test]
fn families_can_be_built_from_public_options() {
    let variants = [
        Variant { label: 0, color: 0, icon_visible: true, with_badge: true },
        Variant { label: 1, color: 0, icon_visible: false, with_badge: false },
    ];
    let tree = tree_of(&variants);
    let slot_options = SlotOptions { never_slots: vec![ValueType::Fills], ..Default::default() };
    let options = CompiledSlotOptions::new(&slot_options);

    let family = ComponentFamily::build("button", tree.child_nodes().iter().collect(), &options).unwrap();
    assert_eq!(family.instance_count, 2);
    assert!(family.detection.slots.contains_key("children[1].visible"));
    assert!(family.detection.slots.contains_key("children[2]"));

    for (member, record) in family.members.iter().zip(family.overrides()) {
        assert!(apply_overrides(&family.template, &record).eq_ignoring_ids(member));
    }
}

proptest! {
    #[test]
    fn detection_bounds_hold(variants in prop::collection::vec(arb_variant(), 0..6), options in arb_slot_options()) {
        let tree = tree_of(&variants);
        let result = detect_slots(tree.child_nodes(), &options);

        prop_assert!((0.0..=1.0).contains(&result.similarity_score));
        prop_assert!(result.matching_paths <= result.total_paths);
        if let Some(cap) = options.max_slots {
            prop_assert!(result.slot_count() <= cap);
        }
        if variants.len() < 2 {
            prop_assert!(result.slots.is_empty());
            prop_assert_eq!(result.similarity_score, 1.0);
        }
        for slot in result.slots.values() {
            prop_assert!(!slot.variations.is_empty());
            prop_assert_eq!(&slot.slot_id, &slot.node_path);
            prop_assert!(slot.value_type != ValueType::Text || options.never_slots.is_empty());
        }
    }

    #[test]
    fn extraction_never_grows_and_restores(
        variants in prop::collection::vec(arb_variant(), 0..6),
        options in arb_slot_options(),
        min_instances in 1usize..4,
    ) {
        let tree = tree_of(&variants);
        let options = ExtractOptions { min_instances, slots: options };
        let out = extract_components("Doc", &tree, Map::new(), &options);

        prop_assert!(out.stats.compressed_size <= out.stats.original_size);
        for definition in out.components.values() {
            prop_assert!(definition.compressed_size < definition.original_size);
            prop_assert!(definition.instance_count >= min_instances);
        }

        let restored = restore_tree(&out.tree, &out.components).unwrap();
        prop_assert!(restored.eq_ignoring_ids(&tree));
    }
}
