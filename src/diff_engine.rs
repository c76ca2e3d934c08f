//! Pure diff logic: patch outcome computation, class-set reconciliation and
//! child-slot classification. Nothing in this module touches a toolkit; the
//! patcher executes the values produced here.

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::types::{AttributeAssignment, ClassDelta, Description, NodeEdit, PatchOutcome};

/// Compare two descriptions of one node slot.
///
/// Full value equality is checked once here and short-circuits to [`Keep`]
/// before any kind-specific logic runs. Descriptions of differing kind are
/// unconditionally [`Replace`]; no attempt is made to reuse the old widget.
///
/// [`Keep`]: PatchOutcome::Keep
/// [`Replace`]: PatchOutcome::Replace
pub fn patch(old: &Description, new: &Description) -> PatchOutcome {
    if old == new {
        return PatchOutcome::Keep;
    }
    if !old.same_kind(new) {
        return PatchOutcome::Replace;
    }
    PatchOutcome::Modify(node_edit(old.attributes(), new.attributes()))
}

/// The in-place edit for a matching-kind pair: the new property list in
/// full (no per-property diffing against the old one) plus the tag-set diff.
fn node_edit(old: &[AttributeAssignment], new: &[AttributeAssignment]) -> NodeEdit {
    NodeEdit {
        properties: collect_properties(new),
        classes: diff_classes(&collect_classes(old), &collect_classes(new)),
    }
}

/// Flatten the property assignments of an attribute list. A later assignment
/// to the same key wins.
pub(crate) fn collect_properties(attributes: &[AttributeAssignment]) -> IndexMap<String, Value> {
    let mut properties = IndexMap::new();
    for attribute in attributes {
        if let AttributeAssignment::Property { key, value } = attribute {
            properties.insert(key.clone(), value.clone());
        }
    }
    properties
}

/// Union of every tag set declared by an attribute list.
pub(crate) fn collect_classes(attributes: &[AttributeAssignment]) -> IndexSet<String> {
    let mut classes = IndexSet::new();
    for attribute in attributes {
        if let AttributeAssignment::Classes(tags) = attribute {
            classes.extend(tags.iter().cloned());
        }
    }
    classes
}

/// Proper set diff between two tag sets: tags only in `old` are removed,
/// tags only in `new` are added, the intersection is left untouched.
pub fn diff_classes(old: &IndexSet<String>, new: &IndexSet<String>) -> ClassDelta {
    ClassDelta {
        added: new.iter().filter(|t| !old.contains(*t)).cloned().collect(),
        removed: old.iter().filter(|t| !new.contains(*t)).cloned().collect(),
    }
}

/// What to do with one logical child slot, classified by which of the three
/// independently-lengthed sequences (live children, prior descriptions, new
/// descriptions) has an entry there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotClass {
    /// Live widget, prior and new description all present: patch in place.
    Patch,
    /// Live widget with no prior description: rebuild it from the new one.
    Rebuild,
    /// Only a new description: create a widget and append it.
    Append,
    /// The description was deleted: remove the live widget.
    Remove,
    /// A prior description with neither live widget nor new description.
    AlreadyAbsent,
    /// A live widget neither description accounts for: caller supplied a
    /// prior tree that does not match the live tree.
    Stray,
}

/// Classify a slot index by presence in each of the three sequences.
/// `None` means every sequence is exhausted and the walk terminates.
pub(crate) fn classify_slot(live: bool, old: bool, new: bool) -> Option<SlotClass> {
    match (live, old, new) {
        (true, true, true) => Some(SlotClass::Patch),
        (true, false, true) => Some(SlotClass::Rebuild),
        (false, _, true) => Some(SlotClass::Append),
        (true, true, false) => Some(SlotClass::Remove),
        (false, true, false) => Some(SlotClass::AlreadyAbsent),
        (true, false, false) => Some(SlotClass::Stray),
        (false, false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LeafNode, PackedChild, PackedListNode, Packing};
    use serde_json::json;

    fn label(text: &str) -> Description {
        Description::Leaf(LeafNode {
            class: "Label".to_string(),
            attributes: vec![AttributeAssignment::Property {
                key: "text".to_string(),
                value: json!(text),
            }],
        })
    }

    fn button(text: &str) -> Description {
        Description::Leaf(LeafNode {
            class: "Button".to_string(),
            attributes: vec![AttributeAssignment::Property {
                key: "label".to_string(),
                value: json!(text),
            }],
        })
    }

    fn tags(names: &[&str]) -> IndexSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn equal_descriptions_short_circuit_to_keep() {
        assert_eq!(patch(&label("a"), &label("a")), PatchOutcome::Keep);
    }

    #[test]
    fn kind_mismatch_always_replaces() {
        assert_eq!(patch(&label("a"), &button("a")), PatchOutcome::Replace);

        // Content equality is irrelevant once kinds differ.
        let list = Description::PackedList(PackedListNode {
            attributes: Vec::new(),
            children: Vec::new(),
        });
        assert_eq!(patch(&label("a"), &list), PatchOutcome::Replace);
        assert_eq!(patch(&list, &label("a")), PatchOutcome::Replace);
    }

    #[test]
    fn modify_carries_the_full_new_property_list() {
        let old = Description::Leaf(LeafNode {
            class: "Label".to_string(),
            attributes: vec![
                AttributeAssignment::Property {
                    key: "text".to_string(),
                    value: json!("before"),
                },
                AttributeAssignment::Property {
                    key: "xalign".to_string(),
                    value: json!(0.0),
                },
            ],
        });
        let new = Description::Leaf(LeafNode {
            class: "Label".to_string(),
            attributes: vec![
                AttributeAssignment::Property {
                    key: "text".to_string(),
                    value: json!("after"),
                },
                AttributeAssignment::Property {
                    key: "xalign".to_string(),
                    value: json!(0.0),
                },
            ],
        });
        match patch(&old, &new) {
            PatchOutcome::Modify(edit) => {
                // The unchanged property is re-applied too.
                assert_eq!(edit.properties.len(), 2);
                assert_eq!(edit.properties["text"], json!("after"));
                assert_eq!(edit.properties["xalign"], json!(0.0));
                assert!(edit.classes.is_empty());
            }
            outcome => panic!("expected Modify, got {outcome:?}"),
        }
    }

    #[test]
    fn later_property_assignment_wins() {
        let attributes = vec![
            AttributeAssignment::Property {
                key: "text".to_string(),
                value: json!("first"),
            },
            AttributeAssignment::Property {
                key: "text".to_string(),
                value: json!("second"),
            },
        ];
        let properties = collect_properties(&attributes);
        assert_eq!(properties.len(), 1);
        assert_eq!(properties["text"], json!("second"));
    }

    #[test]
    fn class_diff_is_a_proper_set_diff() {
        let delta = diff_classes(&tags(&["focused", "clip"]), &tags(&["clip", "blurred"]));
        assert_eq!(delta.added, vec!["blurred".to_string()]);
        assert_eq!(delta.removed, vec!["focused".to_string()]);
    }

    #[test]
    fn class_union_spans_multiple_assignments() {
        let attributes = vec![
            AttributeAssignment::Classes(tags(&["clip"])),
            AttributeAssignment::Classes(tags(&["clip", "focused"])),
        ];
        assert_eq!(collect_classes(&attributes), tags(&["clip", "focused"]));
    }

    #[test]
    fn packing_only_change_still_compares_equal_at_the_node() {
        // Packing lives outside the child description, so the per-slot patch
        // of the node itself is Keep; the packed list as a whole differs.
        let old_child = PackedChild {
            node: label("a"),
            packing: Packing::default(),
        };
        let new_child = PackedChild {
            node: label("a"),
            packing: Packing {
                expand: true,
                fill: true,
                padding: 4,
            },
        };
        assert_eq!(patch(&old_child.node, &new_child.node), PatchOutcome::Keep);
        assert_ne!(old_child, new_child);
    }

    #[test]
    fn slot_classification_matches_the_action_table() {
        assert_eq!(classify_slot(true, true, true), Some(SlotClass::Patch));
        assert_eq!(classify_slot(true, false, true), Some(SlotClass::Rebuild));
        assert_eq!(classify_slot(false, true, true), Some(SlotClass::Append));
        assert_eq!(classify_slot(false, false, true), Some(SlotClass::Append));
        assert_eq!(classify_slot(true, true, false), Some(SlotClass::Remove));
        assert_eq!(
            classify_slot(false, true, false),
            Some(SlotClass::AlreadyAbsent)
        );
        assert_eq!(classify_slot(true, false, false), Some(SlotClass::Stray));
        assert_eq!(classify_slot(false, false, false), None);
    }
}
